//! Command-line interface for treeconf
//!
//! Provides commands to query, edit, merge and convert configuration files.
//! Keylists are written with dots on the command line (`section.option`).

use crate::conversion::{ArrayDtype, Conversion, ConversionOptions, DateTimeFormat, Severity};
use crate::format::{load_lines, parse_lines, Convention, ReadOptions, WriteOptions};
use crate::logging::LogConfig;
use crate::tree::{ConfigNode, Keylist};
use crate::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// treeconf command-line interface
#[derive(Parser, Debug)]
#[command(name = "treeconf")]
#[command(about = "Query and edit hierarchical configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct TreeConfCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    /// Read logging settings from a configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_config: Option<PathBuf>,

    /// Dotted keylist of the logging section in --log-config
    #[arg(long, global = true, default_value = "logging")]
    pub log_section: String,

    #[command(flatten)]
    pub read: ReadArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// How input files are read
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// File convention (nested, flat, dotted)
    #[arg(long, global = true, default_value = "nested", value_parser = parse_convention)]
    pub convention: Convention,

    /// Character starting a comment
    #[arg(long, global = true, default_value_t = '#')]
    pub comment_char: char,

    /// Character delimiting cross-references
    #[arg(long, global = true, default_value_t = '%')]
    pub reference_char: char,

    /// Indentation width of one nesting level
    #[arg(long, global = true, default_value_t = 4)]
    pub indentation: usize,
}

impl ReadArgs {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::default()
            .with_convention(self.convention)
            .with_comment_char(self.comment_char)
            .with_reference_char(self.reference_char)
            .with_indentation(self.indentation)
    }

    /// Files are written back in the convention they were read with.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::default()
            .with_convention(self.convention)
            .with_comment_char(self.comment_char)
            .with_indentation(self.indentation)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print an option value, converted to a type
    Get {
        /// Configuration file
        file: PathBuf,

        /// Dotted keylist of the option
        keylist: String,

        /// Conversion tag (string, path, bool, int, float, stringlist,
        /// log_level, np_fromfile, datetime)
        #[arg(short = 't', long = "type", default_value = "string")]
        type_tag: String,

        /// Evaluate int and float values as arithmetic expressions
        #[arg(long)]
        use_eval: bool,

        /// Separator for stringlist values
        #[arg(long)]
        separator: Option<String>,

        /// Maximum number of splits for stringlist values
        #[arg(long)]
        max_split: Option<usize>,

        /// Element type for np_fromfile values
        #[arg(long, value_parser = parse_dtype)]
        dtype: Option<ArrayDtype>,

        /// Number of elements for np_fromfile values
        #[arg(long)]
        count: Option<usize>,

        /// Byte offset for np_fromfile values
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Pattern or preset for datetime values
        #[arg(long)]
        format: Option<String>,
    },

    /// List the options of a section
    List {
        /// Configuration file
        file: PathBuf,

        /// Dotted keylist of the section (default: root)
        keylist: Option<String>,

        /// List every option below the section as a dotted keylist
        #[arg(short, long)]
        recursive: bool,
    },

    /// Set an option value and write the file back
    Set {
        /// Configuration file
        file: PathBuf,

        /// Dotted keylist of the option
        keylist: String,

        /// New value
        value: String,

        /// Create missing sections
        #[arg(short, long)]
        create: bool,
    },

    /// Remove an option or a section and write the file back
    Remove {
        /// Configuration file
        file: PathBuf,

        /// Dotted keylist of the option or section
        keylist: String,
    },

    /// Replace a substring in option values and write the file back
    Substitute {
        /// Configuration file
        file: PathBuf,

        /// Text to replace
        old: String,

        /// Replacement text
        new: String,

        /// Dotted keylist of the option or section (default: root)
        keylist: Option<String>,
    },

    /// Merge a configuration into another one
    Merge {
        /// Configuration receiving the options
        base: PathBuf,

        /// Configuration whose options win on conflict
        other: PathBuf,

        /// Dotted keylist of the section receiving the options (default: root)
        #[arg(long)]
        into: Option<String>,

        /// Create missing sections for --into
        #[arg(short, long)]
        create: bool,

        /// Output file (default: overwrite base)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite a configuration in another convention, keeping references
    Convert {
        /// Input file, read with the global read options
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Output convention (nested, flat, dotted)
        #[arg(long, value_parser = parse_convention)]
        to: Convention,

        /// Output indentation width (default: the input indentation)
        #[arg(long)]
        out_indentation: Option<usize>,
    },
}

impl TreeConfCli {
    /// Logging settings: the --log-config section when given, else a preset.
    /// --verbose always lowers the level to debug.
    pub fn log_config(&self) -> Result<LogConfig> {
        let mut log_config = match &self.log_config {
            Some(path) => {
                let config = ConfigNode::from_file(path, &self.read.read_options())?;
                LogConfig::from_tree(&config, &parse_keylist(&self.log_section))?
            }
            None if self.verbose => LogConfig::development(),
            None => LogConfig::default(),
        };
        if self.verbose {
            log_config.level = Severity::Debug;
        }
        Ok(log_config)
    }
}

fn parse_convention(s: &str) -> std::result::Result<Convention, String> {
    s.parse().map_err(|e: crate::TreeConfigError| e.to_string())
}

fn parse_dtype(s: &str) -> std::result::Result<ArrayDtype, String> {
    s.parse().map_err(|e: crate::TreeConfigError| e.to_string())
}

/// Splits a dotted keylist; an empty string is the root.
pub fn parse_keylist(dotted: &str) -> Keylist {
    if dotted.is_empty() {
        return Vec::new();
    }
    dotted.split('.').map(String::from).collect()
}

/// CLI command executor
pub struct TreeConfCliExecutor {
    read: ReadArgs,
    json_output: bool,
}

impl TreeConfCliExecutor {
    /// Create a new CLI executor
    pub fn new(read: ReadArgs, json_output: bool) -> Self {
        Self { read, json_output }
    }

    /// Execute a CLI command, returning what it prints
    pub fn execute(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Get {
                file,
                keylist,
                type_tag,
                use_eval,
                separator,
                max_split,
                dtype,
                count,
                offset,
                format,
            } => {
                let options = ConversionOptions {
                    use_eval,
                    separator,
                    max_split,
                    dtype: dtype.unwrap_or_default(),
                    count,
                    offset,
                    datetime_format: format
                        .as_deref()
                        .map(DateTimeFormat::from)
                        .unwrap_or_default(),
                };
                self.get(&file, &keylist, &type_tag, &options)
            }
            Commands::List {
                file,
                keylist,
                recursive,
            } => self.list(&file, keylist.as_deref().unwrap_or(""), recursive),
            Commands::Set {
                file,
                keylist,
                value,
                create,
            } => {
                let config = self.load_unresolved(&file)?;
                config.set(&parse_keylist(&keylist), value, create)?;
                self.store(&config, &file, &self.read.write_options())?;
                Ok(self.status("set", &keylist))
            }
            Commands::Remove { file, keylist } => {
                let config = self.load_unresolved(&file)?;
                config.remove_option(&parse_keylist(&keylist))?;
                self.store(&config, &file, &self.read.write_options())?;
                Ok(self.status("removed", &keylist))
            }
            Commands::Substitute {
                file,
                old,
                new,
                keylist,
            } => {
                let keylist = keylist.unwrap_or_default();
                let config = self.load_unresolved(&file)?;
                config.substitution(&old, &new, &parse_keylist(&keylist))?;
                self.store(&config, &file, &self.read.write_options())?;
                Ok(self.status("substituted", &keylist))
            }
            Commands::Merge {
                base,
                other,
                into,
                create,
                output,
            } => {
                let into = into.unwrap_or_default();
                let config = self.load_unresolved(&base)?;
                let incoming = self.load_unresolved(&other)?;
                config.merge(&incoming, &parse_keylist(&into), create)?;
                let target = output.unwrap_or(base);
                self.store(&config, &target, &self.read.write_options())?;
                Ok(self.status("merged", &target.display().to_string()))
            }
            Commands::Convert {
                input,
                output,
                to,
                out_indentation,
            } => {
                let config = self.load_unresolved(&input)?;
                let options = self
                    .read
                    .write_options()
                    .with_convention(to)
                    .with_indentation(out_indentation.unwrap_or(self.read.indentation));
                self.store(&config, &output, &options)?;
                Ok(self.status("converted", &output.display().to_string()))
            }
        }
    }

    fn get(
        &self,
        file: &Path,
        keylist: &str,
        type_tag: &str,
        options: &ConversionOptions,
    ) -> Result<String> {
        let conversion: Conversion = type_tag.parse()?;
        let config = self.load(file)?;
        let value = config.get(&parse_keylist(keylist), conversion, options)?;
        debug!(keylist, conversion = %conversion, "Converted option");

        if self.json_output {
            Ok(json!({ "keylist": keylist, "type": conversion.tag(), "value": value }).to_string())
        } else {
            Ok(value.to_string())
        }
    }

    fn list(&self, file: &Path, keylist: &str, recursive: bool) -> Result<String> {
        let config = self.load(file)?;
        let section = config.subconfig(&parse_keylist(keylist))?;
        let names: Vec<String> = if recursive {
            section
                .suboptions()
                .into_iter()
                .map(|keylist| keylist.join("."))
                .collect()
        } else {
            section.options(crate::tree::ROOT)?
        };

        if self.json_output {
            Ok(json!(names).to_string())
        } else {
            Ok(names.join("\n"))
        }
    }

    fn load(&self, file: &Path) -> Result<ConfigNode> {
        crate::trace_performance!("read_file", {
            ConfigNode::from_file(file, &self.read.read_options())
        })
    }

    /// Parses without resolving references, so commands that write the file
    /// back keep every `%a.b%` token as written.
    fn load_unresolved(&self, file: &Path) -> Result<ConfigNode> {
        let config = ConfigNode::new();
        let lines = load_lines(file)?;
        crate::trace_performance!("parse_file", {
            parse_lines(&config, &lines, &self.read.read_options())
        })?;
        Ok(config)
    }

    fn store(&self, config: &ConfigNode, file: &Path, options: &WriteOptions) -> Result<()> {
        info!(path = %file.display(), convention = %options.convention, "Saving configuration");
        config.write_to_file(file, options)
    }

    fn status(&self, action: &str, target: &str) -> String {
        if self.json_output {
            json!({ "status": action, "target": target }).to_string()
        } else {
            format!("{}: {}", action, target)
        }
    }
}
