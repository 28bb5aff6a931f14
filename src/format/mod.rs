//! Reading and writing configuration files
//!
//! Three conventions are supported:
//!
//! - **nested**: `[section]` headers whose indentation gives their depth,
//!   options indented the same way
//! - **flat**: one level of `[section]` headers, no indentation
//! - **dotted**: `section.subsection.option = value`, no headers
//!
//! Reading a file parses every line into the tree, then resolves
//! `%section.option%` cross-references in one pass over all options.

pub mod parser;
pub mod references;
pub mod writer;

pub use parser::parse_lines;
pub use references::{extract_references, resolve_references};
pub use writer::render_lines;

use crate::tree::ConfigNode;
use crate::{Result, TreeConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, instrument};

/// Textual layout of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    #[default]
    Nested,
    Flat,
    Dotted,
}

impl Convention {
    pub fn name(self) -> &'static str {
        match self {
            Convention::Nested => "nested",
            Convention::Flat => "flat",
            Convention::Dotted => "dotted",
        }
    }
}

impl FromStr for Convention {
    type Err = TreeConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nested" | "py" => Ok(Convention::Nested),
            "flat" => Ok(Convention::Flat),
            "dotted" | "cpp" => Ok(Convention::Dotted),
            _ => Err(TreeConfigError::UnsupportedConvention(s.to_string())),
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for reading a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    pub convention: Convention,
    /// Starts a comment, unless preceded by a backslash
    pub comment_char: char,
    /// Delimits cross-references
    pub reference_char: char,
    /// Width of one nesting level for the nested convention
    pub indentation: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            convention: Convention::Nested,
            comment_char: '#',
            reference_char: '%',
            indentation: 4,
        }
    }
}

impl ReadOptions {
    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_comment_char(mut self, comment_char: char) -> Self {
        self.comment_char = comment_char;
        self
    }

    pub fn with_reference_char(mut self, reference_char: char) -> Self {
        self.reference_char = reference_char;
        self
    }

    pub fn with_indentation(mut self, indentation: usize) -> Self {
        self.indentation = indentation;
        self
    }
}

/// Settings for writing a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub convention: Convention,
    /// Width of one nesting level for the nested convention
    pub indentation: usize,
    /// Escaped with a backslash wherever it occurs in keys or values
    pub comment_char: char,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            convention: Convention::Nested,
            indentation: 4,
            comment_char: '#',
        }
    }
}

impl WriteOptions {
    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_indentation(mut self, indentation: usize) -> Self {
        self.indentation = indentation;
        self
    }

    pub fn with_comment_char(mut self, comment_char: char) -> Self {
        self.comment_char = comment_char;
        self
    }
}

impl ConfigNode {
    /// Creates a configuration from a file.
    pub fn from_file(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let config = ConfigNode::new();
        config.read_file(path, options)?;
        Ok(config)
    }

    /// Reads and parses a file, inserting its options in this tree, then
    /// resolves cross-references.
    #[instrument(skip_all)]
    pub fn read_file(&self, path: impl AsRef<Path>, options: &ReadOptions) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), convention = %options.convention, "Reading configuration file");
        let lines = load_lines(path)?;
        self.read_lines(&lines, options)
    }

    /// Same as [`ConfigNode::read_file`] for text already in memory.
    pub fn read_str(&self, text: &str, options: &ReadOptions) -> Result<()> {
        self.read_lines(text.lines(), options)
    }

    pub fn read_lines<I, S>(&self, lines: I, options: &ReadOptions) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parse_lines(self, lines, options)?;
        resolve_references(self, options.reference_char)
    }

    /// Writes the tree to a file that [`ConfigNode::read_file`] can read back.
    #[instrument(skip_all)]
    pub fn write_to_file(&self, path: impl AsRef<Path>, options: &WriteOptions) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), convention = %options.convention, "Writing configuration file");
        store_lines(path, &render_lines(self, options))
    }

    /// Serializes the tree, one line per header or option.
    pub fn to_text(&self, options: &WriteOptions) -> String {
        let mut text = String::new();
        for line in render_lines(self, options) {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }
}

/// Reads a whole file as lines, without line terminators.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(String::from).collect())
}

/// Writes `lines` to `path`, each followed by a newline.
pub fn store_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }

    // Atomic write
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, content)?;
    fs::rename(temp_path, path)?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Cuts `line` at the first comment character not preceded by a backslash.
/// Escaped comment characters are kept without their backslash.
pub(crate) fn strip_comment(line: &str, comment_char: char) -> String {
    let mut stripped = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&comment_char) {
            stripped.push(comment_char);
            chars.next();
        } else if c == comment_char {
            break;
        } else {
            stripped.push(c);
        }
    }
    stripped
}
