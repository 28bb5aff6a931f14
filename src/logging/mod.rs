//! Structured logging configuration for treeconf

use crate::conversion::Severity;
use crate::tree::ConfigNode;
use crate::{Result, TreeConfigError};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration for treeconf
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Least severe level that is emitted
    pub level: Severity,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Output destination (stderr, file)
    pub output: LogOutput,
    /// File path for file output
    pub file_path: Option<String>,
    /// Include source file and line numbers
    pub include_source: bool,
    /// Include thread names
    pub include_thread_names: bool,
}

/// Log output formats
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Compact format for everyday use
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = TreeConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(TreeConfigError::InvalidValue {
                conversion: "log format",
                value: s.to_string(),
                reason: "expected pretty, compact or json".to_string(),
            }),
        }
    }
}

/// Log output destinations
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    /// Standard error, leaving standard output to command results
    Stderr,
    /// File output
    File,
}

impl FromStr for LogOutput {
    type Err = TreeConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            _ => Err(TreeConfigError::InvalidValue {
                conversion: "log output",
                value: s.to_string(),
                reason: "expected stderr or file".to_string(),
            }),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Severity::Warning,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: false,
            include_thread_names: false,
        }
    }
}

impl LogConfig {
    /// Create a development-friendly log configuration
    pub fn development() -> Self {
        Self {
            level: Severity::Debug,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: true,
            include_thread_names: true,
        }
    }

    /// Reads the logging settings stored in the section at `keylist`.
    ///
    /// Recognized options are `level`, `format`, `output`, `file`, `source`
    /// and `thread_names`. Missing options keep their default.
    ///
    /// ```text
    /// [logging]
    ///     level = info
    ///     output = file
    ///     file = /var/log/app.log
    /// ```
    pub fn from_tree<K: AsRef<str>>(config: &ConfigNode, keylist: &[K]) -> Result<Self> {
        let section = config.subconfig(keylist)?;
        let mut log_config = Self::default();

        if section.has_option(&["level"]) {
            log_config.level = section.get_log_level(&["level"])?;
        }
        if section.has_option(&["format"]) {
            log_config.format = section.get_str(&["format"])?.parse()?;
        }
        if section.has_option(&["output"]) {
            log_config.output = section.get_str(&["output"])?.parse()?;
        }
        if section.has_option(&["file"]) {
            log_config.file_path = Some(section.get_str(&["file"])?);
        }
        if section.has_option(&["source"]) {
            log_config.include_source = section.get_bool(&["source"])?;
        }
        if section.has_option(&["thread_names"]) {
            log_config.include_thread_names = section.get_bool(&["thread_names"])?;
        }

        Ok(log_config)
    }
}

/// Initialize the global tracing subscriber with the given configuration
pub fn init_logging(config: &LogConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let filter = create_filter(config);

    match (&config.output, &config.file_path) {
        (LogOutput::Stderr, _) => {
            let layer = create_stderr_layer(config);
            tracing_subscriber::registry()
                .with(layer.with_filter(filter))
                .try_init()?;
        }
        (LogOutput::File, Some(file_path)) => {
            let layer = create_file_layer(config, file_path)?;
            tracing_subscriber::registry()
                .with(layer.with_filter(filter))
                .try_init()?;
        }
        (LogOutput::File, None) => {
            return Err("File path required for file output".into());
        }
    }

    info!("Logging initialized with config: {:?}", config);
    Ok(())
}

fn level_directive(level: Severity) -> &'static str {
    match level {
        Severity::Debug => "debug",
        Severity::Info => "info",
        Severity::Warning => "warn",
        Severity::Error | Severity::Critical => "error",
    }
}

/// Create an environment filter based on the configuration
fn create_filter(config: &LogConfig) -> EnvFilter {
    let filter_str = format!("treeconf={}", level_directive(config.level));

    // Allow environment override
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str))
}

/// Create a stderr logging layer
fn create_stderr_layer(config: &LogConfig) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
    match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_timer(UtcTime::rfc_3339())
                .with_thread_names(config.include_thread_names)
                .with_file(config.include_source)
                .with_line_number(config.include_source);

            Box::new(layer)
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_timer(UtcTime::rfc_3339())
                .with_thread_names(config.include_thread_names)
                .with_file(config.include_source)
                .with_line_number(config.include_source);

            Box::new(layer)
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_timer(UtcTime::rfc_3339())
                .with_thread_names(config.include_thread_names)
                .with_file(config.include_source)
                .with_line_number(config.include_source);

            Box::new(layer)
        }
    }
}

/// Create a file logging layer
fn create_file_layer(
    config: &LogConfig,
    file_path: &str,
) -> std::result::Result<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>, Box<dyn std::error::Error>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;

    match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(file)
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_thread_names(config.include_thread_names)
                .with_file(config.include_source)
                .with_line_number(config.include_source);

            Ok(Box::new(layer))
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(file)
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_thread_names(config.include_thread_names)
                .with_file(config.include_source)
                .with_line_number(config.include_source);

            Ok(Box::new(layer))
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(file)
                .with_timer(UtcTime::rfc_3339())
                .with_thread_names(config.include_thread_names)
                .with_file(config.include_source)
                .with_line_number(config.include_source);

            Ok(Box::new(layer))
        }
    }
}

/// Performance tracing for file-level operations
#[macro_export]
macro_rules! trace_performance {
    ($name:expr, $block:block) => {{
        let span = tracing::debug_span!("performance", operation = $name);
        let _enter = span.enter();
        let start = std::time::Instant::now();

        let result = $block;

        tracing::debug!(
            operation = $name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Performance trace"
        );

        result
    }};
}

/// Initialize logging for testing environments
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let config = LogConfig {
            level: Severity::Debug,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: true,
            include_thread_names: false,
        };

        if let Err(e) = init_logging(&config) {
            eprintln!("Failed to initialize test logging: {}", e);
        }
    });
}
