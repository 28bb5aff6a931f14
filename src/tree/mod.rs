//! Configuration tree: sections, leaves and keylist addressing

pub mod node;

pub use node::{ConfigNode, Keylist, Node, ROOT};
