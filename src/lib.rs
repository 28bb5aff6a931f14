//! treeconf - Hierarchical Text Configuration Files
//!
//! A configuration is a tree of named sections and leaf values addressed by
//! keylists. Trees are read from and written to three textual conventions
//! (nested, flat and dotted), leaf values may reference each other with
//! `%a.b.c%` tokens, and leaves are converted to typed values on demand.

pub mod cli;
pub mod conversion;
pub mod format;
pub mod logging;
pub mod tree;

pub use conversion::{convert, Conversion, ConversionOptions, ConvertedValue, Severity};
pub use format::{Convention, ReadOptions, WriteOptions};
pub use tree::{ConfigNode, Keylist, Node};

/// Result type alias for treeconf operations
pub type Result<T> = std::result::Result<T, TreeConfigError>;

/// Error types specific to treeconf operations
#[derive(thiserror::Error, Debug)]
pub enum TreeConfigError {
    #[error("Key not found: {keylist}")]
    KeyNotFound { keylist: String },

    #[error("Not a section: {keylist}")]
    NotASection { keylist: String },

    #[error("Not an option: {keylist} is a section")]
    NotALeaf { keylist: String },

    #[error("Empty keylist")]
    EmptyKeylist,

    #[error("Indentation error at line {line_number}: {line:?}")]
    Indentation { line_number: usize, line: String },

    #[error("Cross-reference error: cannot resolve {keylist}")]
    CrossReference { keylist: String },

    #[error("Invalid value for {conversion} conversion: {value:?} ({reason})")]
    InvalidValue {
        conversion: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown conversion \"string to {0}\"")]
    UnsupportedConversion(String),

    #[error("Unknown convention: {0}")]
    UnsupportedConvention(String),

    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),
}
