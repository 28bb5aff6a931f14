//! Conversion of option text to typed values
//!
//! Every conversion is a pure function of the option text and a
//! [`ConversionOptions`]. Conversions are selected with a [`Conversion`],
//! usually parsed from its tag name (`"int"`, `"stringlist"`, ...).

pub mod binary;
pub mod expression;

pub use binary::{ArrayDtype, NumericArray};

use crate::{Result, TreeConfigError};
use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::trace;

/// The available conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    String,
    Path,
    Bool,
    Int,
    Float,
    StringList,
    LogLevel,
    BinaryArray,
    DateTime,
}

impl Conversion {
    pub const ALL: [Conversion; 9] = [
        Conversion::String,
        Conversion::Path,
        Conversion::Bool,
        Conversion::Int,
        Conversion::Float,
        Conversion::StringList,
        Conversion::LogLevel,
        Conversion::BinaryArray,
        Conversion::DateTime,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Conversion::String => "string",
            Conversion::Path => "path",
            Conversion::Bool => "bool",
            Conversion::Int => "int",
            Conversion::Float => "float",
            Conversion::StringList => "stringlist",
            Conversion::LogLevel => "log_level",
            Conversion::BinaryArray => "np_fromfile",
            Conversion::DateTime => "datetime",
        }
    }

    /// Converts `value`.
    pub fn apply(self, value: &str, options: &ConversionOptions) -> Result<ConvertedValue> {
        trace!(conversion = self.tag(), value, "Converting option");

        Ok(match self {
            Conversion::String => ConvertedValue::String(value.to_string()),
            Conversion::Path => ConvertedValue::Path(string_to_path(value)),
            Conversion::Bool => ConvertedValue::Bool(string_to_bool(value)?),
            Conversion::Int => ConvertedValue::Int(string_to_int(value, options.use_eval)?),
            Conversion::Float => ConvertedValue::Float(string_to_float(value, options.use_eval)?),
            Conversion::StringList => ConvertedValue::StringList(string_to_stringlist(
                value,
                options.separator.as_deref(),
                options.max_split,
            )?),
            Conversion::LogLevel => ConvertedValue::LogLevel(string_to_log_level(value)?),
            Conversion::BinaryArray => ConvertedValue::Array(binary::read_array(
                Path::new(value),
                options.dtype,
                options.count,
                options.offset,
            )?),
            Conversion::DateTime => {
                ConvertedValue::DateTime(string_to_datetime(value, &options.datetime_format)?)
            }
        })
    }
}

impl FromStr for Conversion {
    type Err = TreeConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Conversion::String),
            "path" => Ok(Conversion::Path),
            "bool" => Ok(Conversion::Bool),
            "int" => Ok(Conversion::Int),
            "float" => Ok(Conversion::Float),
            "stringlist" => Ok(Conversion::StringList),
            "log_level" => Ok(Conversion::LogLevel),
            "np_fromfile" | "binary_array" => Ok(Conversion::BinaryArray),
            "datetime" => Ok(Conversion::DateTime),
            _ => Err(TreeConfigError::UnsupportedConversion(s.to_string())),
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Options understood by the conversions. Each conversion only looks at
/// the fields that concern it.
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// `int` and `float`: evaluate the text as an arithmetic expression
    pub use_eval: bool,
    /// `stringlist`: delimiter, any whitespace run when `None`
    pub separator: Option<String>,
    /// `stringlist`: maximum number of splits, unlimited when `None`
    pub max_split: Option<usize>,
    /// `np_fromfile`: element type
    pub dtype: ArrayDtype,
    /// `np_fromfile`: number of elements to read, all when `None`
    pub count: Option<usize>,
    /// `np_fromfile`: bytes to skip at the start of the file
    pub offset: u64,
    /// `datetime`: parsing pattern
    pub datetime_format: DateTimeFormat,
}

impl ConversionOptions {
    pub fn with_eval(mut self) -> Self {
        self.use_eval = true;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn with_max_split(mut self, max_split: usize) -> Self {
        self.max_split = Some(max_split);
        self
    }

    pub fn with_dtype(mut self, dtype: ArrayDtype) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_datetime_format(mut self, format: impl Into<DateTimeFormat>) -> Self {
        self.datetime_format = format.into();
        self
    }
}

/// Pattern used by the `datetime` conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateTimeFormat {
    /// `%Y-%m-%d`
    #[default]
    PolyphemusDate,
    /// `%Y-%m-%d_%H-%M`
    PolyphemusDateTime,
    /// `%Y-%m-%dT%H:%M:%SZ`
    EcmwfDateTime,
    /// Any strftime-style pattern
    Custom(String),
}

impl DateTimeFormat {
    pub fn pattern(&self) -> &str {
        match self {
            DateTimeFormat::PolyphemusDate => "%Y-%m-%d",
            DateTimeFormat::PolyphemusDateTime => "%Y-%m-%d_%H-%M",
            DateTimeFormat::EcmwfDateTime => "%Y-%m-%dT%H:%M:%SZ",
            DateTimeFormat::Custom(pattern) => pattern,
        }
    }
}

impl From<&str> for DateTimeFormat {
    /// Preset names are matched case-insensitively; anything else is a pattern.
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "polyphemus_date" => DateTimeFormat::PolyphemusDate,
            "polyphemus_datetime" => DateTimeFormat::PolyphemusDateTime,
            "ecmwf_datetime" => DateTimeFormat::EcmwfDateTime,
            _ => DateTimeFormat::Custom(s.to_string()),
        }
    }
}

/// Logging severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Severity {
    /// Numeric level, 10 for debug up to 50 for critical.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = TreeConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(invalid_value("log_level", s, "not a logging level")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error | Severity::Critical => tracing::Level::ERROR,
        }
    }
}

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConvertedValue {
    String(String),
    Path(PathBuf),
    Bool(bool),
    Int(i64),
    Float(f64),
    StringList(Vec<String>),
    LogLevel(Severity),
    Array(NumericArray),
    DateTime(NaiveDateTime),
}

impl ConvertedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConvertedValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ConvertedValue::Path(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConvertedValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConvertedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConvertedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_stringlist(&self) -> Option<&[String]> {
        match self {
            ConvertedValue::StringList(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_log_level(&self) -> Option<Severity> {
        match self {
            ConvertedValue::LogLevel(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NumericArray> {
        match self {
            ConvertedValue::Array(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            ConvertedValue::DateTime(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ConvertedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertedValue::String(value) => f.write_str(value),
            ConvertedValue::Path(value) => write!(f, "{}", value.display()),
            ConvertedValue::Bool(value) => write!(f, "{}", value),
            ConvertedValue::Int(value) => write!(f, "{}", value),
            ConvertedValue::Float(value) => write!(f, "{}", value),
            ConvertedValue::StringList(values) => write!(f, "{:?}", values),
            ConvertedValue::LogLevel(value) => write!(f, "{}", value),
            ConvertedValue::Array(value) => write!(f, "{:?}", value),
            ConvertedValue::DateTime(value) => write!(f, "{}", value),
        }
    }
}

/// Converts `value` with the conversion named `tag`.
///
/// # Examples
///
/// ```
/// use treeconf::{convert, ConversionOptions, ConvertedValue};
///
/// let options = ConversionOptions::default();
/// assert_eq!(convert("On", "bool", &options).unwrap(), ConvertedValue::Bool(true));
/// assert_eq!(convert("-10", "int", &options).unwrap(), ConvertedValue::Int(-10));
/// assert_eq!(
///     convert("3/2", "float", &options.clone().with_eval()).unwrap(),
///     ConvertedValue::Float(1.5)
/// );
/// assert!(convert("x", "complex", &options).is_err());
/// ```
pub fn convert(value: &str, tag: &str, options: &ConversionOptions) -> Result<ConvertedValue> {
    tag.parse::<Conversion>()?.apply(value, options)
}

pub fn string_to_path(value: &str) -> PathBuf {
    PathBuf::from(value)
}

/// `true`, `yes`, `on`, `1` and `false`, `no`, `off`, `0`, in any case.
pub fn string_to_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid_value("bool", value, "not a boolean")),
    }
}

pub fn string_to_int(value: &str, use_eval: bool) -> Result<i64> {
    if use_eval {
        return expression::evaluate(value)
            .and_then(expression::Number::truncate)
            .map_err(|e| invalid_value("int", value, e));
    }
    strip_digit_separators(value.trim())
        .ok_or_else(|| invalid_value("int", value, "misplaced underscore"))?
        .parse::<i64>()
        .map_err(|e| invalid_value("int", value, e))
}

pub fn string_to_float(value: &str, use_eval: bool) -> Result<f64> {
    if use_eval {
        return expression::evaluate(value)
            .map(expression::Number::as_f64)
            .map_err(|e| invalid_value("float", value, e));
    }
    strip_digit_separators(value.trim())
        .ok_or_else(|| invalid_value("float", value, "misplaced underscore"))?
        .parse::<f64>()
        .map_err(|e| invalid_value("float", value, e))
}

/// Removes `_` digit separators. Each one must sit between two digits,
/// otherwise `None`.
pub(crate) fn strip_digit_separators(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut stripped = String::with_capacity(text.len());
    for (index, &c) in chars.iter().enumerate() {
        if c != '_' {
            stripped.push(c);
            continue;
        }
        let before = index.checked_sub(1).and_then(|i| chars.get(i));
        let after = chars.get(index + 1);
        if !(before.is_some_and(char::is_ascii_digit) && after.is_some_and(char::is_ascii_digit)) {
            return None;
        }
    }
    Some(stripped)
}

/// Splits on `separator`, or on whitespace runs (ignoring leading and
/// trailing whitespace) when `None`. With `max_split`, the remainder after
/// that many splits is kept as the last element.
pub fn string_to_stringlist(
    value: &str,
    separator: Option<&str>,
    max_split: Option<usize>,
) -> Result<Vec<String>> {
    match separator {
        Some("") => Err(invalid_value("stringlist", value, "empty separator")),
        Some(separator) => Ok(match max_split {
            Some(max_split) => value.splitn(max_split + 1, separator).map(String::from).collect(),
            None => value.split(separator).map(String::from).collect(),
        }),
        None => Ok(split_whitespace(value, max_split)),
    }
}

fn split_whitespace(value: &str, max_split: Option<usize>) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = value.trim_start();
    while !rest.is_empty() {
        if max_split.is_some_and(|max_split| parts.len() == max_split) {
            parts.push(rest.to_string());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parts.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    parts
}

pub fn string_to_log_level(value: &str) -> Result<Severity> {
    value.parse()
}

/// Parses `value` with `format`. Patterns without a time of day give midnight.
pub fn string_to_datetime(value: &str, format: &DateTimeFormat) -> Result<NaiveDateTime> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, value, StrftimeItems::new(format.pattern()))
        .map_err(|e| invalid_value("datetime", value, e))?;

    let date = parsed
        .to_naive_date()
        .map_err(|e| invalid_value("datetime", value, e))?;
    match parsed.to_naive_time() {
        Ok(time) => Ok(date.and_time(time)),
        Err(_) => date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid_value("datetime", value, "invalid time of day")),
    }
}

pub(crate) fn invalid_value(
    conversion: &'static str,
    value: &str,
    reason: impl ToString,
) -> TreeConfigError {
    TreeConfigError::InvalidValue {
        conversion,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
