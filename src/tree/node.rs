use crate::conversion::{self, Conversion, ConversionOptions, ConvertedValue, Severity};
use crate::{Result, TreeConfigError};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Path of names from a section down to one of its descendants.
pub type Keylist = Vec<String>;

/// The empty keylist, addressing the node itself.
pub const ROOT: &[&str] = &[];

/// One entry of a section: either a subsection or an unconverted leaf string.
#[derive(PartialEq)]
pub enum Node {
    Section(ConfigNode),
    Leaf(String),
}

impl Node {
    pub fn is_section(&self) -> bool {
        matches!(self, Node::Section(_))
    }

    pub fn as_section(&self) -> Option<&ConfigNode> {
        match self {
            Node::Section(section) => Some(section),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Node::Section(_) => None,
            Node::Leaf(value) => Some(value),
        }
    }

    /// Same leaf text, same (aliased) section.
    fn share(&self) -> Node {
        match self {
            Node::Section(section) => Node::Section(section.share()),
            Node::Leaf(value) => Node::Leaf(value.clone()),
        }
    }

    fn deep_copy(&self) -> Node {
        match self {
            Node::Section(section) => Node::Section(section.deep_copy()),
            Node::Leaf(value) => Node::Leaf(value.clone()),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Section(section) => section.fmt(f),
            Node::Leaf(value) => value.fmt(f),
        }
    }
}

/// A section of the configuration tree.
///
/// A `ConfigNode` is a handle onto section storage. Handles returned by
/// [`ConfigNode::subconfig`] share that storage with the tree they came from,
/// so a mutation through either handle is visible through the other.
/// [`ConfigNode::clone_subtree`] is the way to get an independent copy; the
/// type deliberately does not implement `Clone`.
///
/// Keys keep their insertion order for listing, enumeration and
/// serialization. Overwriting a key keeps its position.
#[derive(Default)]
pub struct ConfigNode {
    entries: Rc<RefCell<IndexMap<String, Node>>>,
}

impl ConfigNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the option value converted with `conversion`.
    ///
    /// # Examples
    ///
    /// ```
    /// use treeconf::{ConfigNode, Conversion, ConversionOptions, ConvertedValue};
    ///
    /// let config = ConfigNode::new();
    /// config.set(&["section1", "subsection11", "option1"], "1", true).unwrap();
    /// let value = config
    ///     .get(&["section1", "subsection11", "option1"], Conversion::Int, &ConversionOptions::default())
    ///     .unwrap();
    /// assert_eq!(value, ConvertedValue::Int(1));
    /// ```
    pub fn get<K: AsRef<str>>(
        &self,
        keylist: &[K],
        conversion: Conversion,
        options: &ConversionOptions,
    ) -> Result<ConvertedValue> {
        let raw = self.get_str(keylist)?;
        conversion.apply(&raw, options)
    }

    /// Same as [`ConfigNode::get`] with the conversion given by its tag name.
    pub fn get_tagged<K: AsRef<str>>(
        &self,
        keylist: &[K],
        tag: &str,
        options: &ConversionOptions,
    ) -> Result<ConvertedValue> {
        let conversion: Conversion = tag.parse()?;
        self.get(keylist, conversion, options)
    }

    /// Returns the unconverted option text.
    pub fn get_str<K: AsRef<str>>(&self, keylist: &[K]) -> Result<String> {
        let (parents, key) = split_leaf(keylist)?;
        match self.section_at(parents)?.child(key) {
            Some(Node::Leaf(value)) => Ok(value),
            Some(Node::Section(_)) => Err(TreeConfigError::NotALeaf {
                keylist: dotted(keylist),
            }),
            None => Err(TreeConfigError::KeyNotFound {
                keylist: dotted(keylist),
            }),
        }
    }

    pub fn get_path<K: AsRef<str>>(&self, keylist: &[K]) -> Result<PathBuf> {
        Ok(conversion::string_to_path(&self.get_str(keylist)?))
    }

    pub fn get_bool<K: AsRef<str>>(&self, keylist: &[K]) -> Result<bool> {
        conversion::string_to_bool(&self.get_str(keylist)?)
    }

    pub fn get_int<K: AsRef<str>>(&self, keylist: &[K]) -> Result<i64> {
        conversion::string_to_int(&self.get_str(keylist)?, false)
    }

    pub fn get_float<K: AsRef<str>>(&self, keylist: &[K]) -> Result<f64> {
        conversion::string_to_float(&self.get_str(keylist)?, false)
    }

    pub fn get_stringlist<K: AsRef<str>>(&self, keylist: &[K]) -> Result<Vec<String>> {
        conversion::string_to_stringlist(&self.get_str(keylist)?, None, None)
    }

    pub fn get_log_level<K: AsRef<str>>(&self, keylist: &[K]) -> Result<Severity> {
        conversion::string_to_log_level(&self.get_str(keylist)?)
    }

    /// Parses the option with the `%Y-%m-%d` pattern.
    pub fn get_datetime<K: AsRef<str>>(&self, keylist: &[K]) -> Result<NaiveDateTime> {
        conversion::string_to_datetime(&self.get_str(keylist)?, &Default::default())
    }

    /// Sets an option value.
    ///
    /// With `update_tree`, missing sections along the keylist are created.
    /// Only options can be created this way: a section never exists on its
    /// own, only as the ancestor of an option.
    pub fn set<K: AsRef<str>>(
        &self,
        keylist: &[K],
        value: impl Into<String>,
        update_tree: bool,
    ) -> Result<()> {
        let (parents, key) = split_leaf(keylist)?;
        let section = self.descend(parents, update_tree)?;
        section
            .entries
            .borrow_mut()
            .insert(key.to_string(), Node::Leaf(value.into()));
        Ok(())
    }

    /// Lists the options and subsections of a section, in insertion order.
    pub fn options<K: AsRef<str>>(&self, keylist: &[K]) -> Result<Vec<String>> {
        let section = self.section_at(keylist)?;
        let keys = section.entries.borrow().keys().cloned().collect();
        Ok(keys)
    }

    /// Removes an option or a whole subsection.
    ///
    /// The parent section is kept even when it becomes empty.
    pub fn remove_option<K: AsRef<str>>(&self, keylist: &[K]) -> Result<()> {
        let (parents, key) = split_leaf(keylist)?;
        let section = self.section_at(parents)?;
        let removed = section.entries.borrow_mut().shift_remove(key);
        match removed {
            Some(_) => Ok(()),
            None => Err(TreeConfigError::KeyNotFound {
                keylist: dotted(keylist),
            }),
        }
    }

    /// Returns the keylist of every option in the tree, depth-first pre-order.
    ///
    /// # Examples
    ///
    /// ```
    /// use treeconf::ConfigNode;
    ///
    /// let config = ConfigNode::new();
    /// config.set(&["option1"], "1", false).unwrap();
    /// config.set(&["section1", "option2"], "2", true).unwrap();
    /// config.set(&["section1", "subsection11", "option3"], "3", true).unwrap();
    /// assert_eq!(
    ///     config.suboptions(),
    ///     vec![
    ///         vec!["option1"],
    ///         vec!["section1", "option2"],
    ///         vec!["section1", "subsection11", "option3"],
    ///     ]
    /// );
    /// ```
    pub fn suboptions(&self) -> Vec<Keylist> {
        let mut keylists = Vec::new();
        self.collect_suboptions(&mut Vec::new(), &mut keylists);
        keylists
    }

    fn collect_suboptions(&self, prefix: &mut Keylist, keylists: &mut Vec<Keylist>) {
        for (key, node) in self.entries.borrow().iter() {
            prefix.push(key.clone());
            match node {
                Node::Section(section) => section.collect_suboptions(prefix, keylists),
                Node::Leaf(_) => keylists.push(prefix.clone()),
            }
            prefix.pop();
        }
    }

    /// Merges another configuration into the section addressed by `keylist`.
    ///
    /// On conflict the values of `other` win. Subsections of `other` are
    /// copied, never aliased, so `other` may be any part of this tree.
    pub fn merge<K: AsRef<str>>(
        &self,
        other: &ConfigNode,
        keylist: &[K],
        update_tree: bool,
    ) -> Result<()> {
        let target = self.descend(keylist, update_tree)?;
        target.merge_entries(&other.deep_copy());
        Ok(())
    }

    /// `other` must not share storage with `self`.
    fn merge_entries(&self, other: &ConfigNode) {
        for (key, node) in other.entries() {
            match node {
                Node::Section(theirs) => {
                    let ours = match self.child(&key) {
                        Some(Node::Section(ours)) => ours,
                        _ => {
                            let fresh = ConfigNode::new();
                            self.entries
                                .borrow_mut()
                                .insert(key, Node::Section(fresh.share()));
                            fresh
                        }
                    };
                    ours.merge_entries(&theirs);
                }
                Node::Leaf(value) => {
                    self.entries.borrow_mut().insert(key, Node::Leaf(value));
                }
            }
        }
    }

    /// Replaces every occurrence of `old` by `new`.
    ///
    /// If `keylist` names an option only that option is changed, if it names
    /// a section every option beneath it is.
    pub fn substitution<K: AsRef<str>>(&self, old: &str, new: &str, keylist: &[K]) -> Result<()> {
        let Some((key, parents)) = keylist.split_last() else {
            self.substitute_all(old, new);
            return Ok(());
        };

        let section = self.section_at(parents)?;
        match section.child(key.as_ref()) {
            Some(Node::Section(subsection)) => subsection.substitute_all(old, new),
            Some(Node::Leaf(value)) => {
                section
                    .entries
                    .borrow_mut()
                    .insert(key.as_ref().to_string(), Node::Leaf(value.replace(old, new)));
            }
            None => {
                return Err(TreeConfigError::KeyNotFound {
                    keylist: dotted(keylist),
                })
            }
        }
        Ok(())
    }

    fn substitute_all(&self, old: &str, new: &str) {
        for node in self.entries.borrow_mut().values_mut() {
            match node {
                Node::Section(section) => section.substitute_all(old, new),
                Node::Leaf(value) => *value = value.replace(old, new),
            }
        }
    }

    /// Returns an independent copy of the addressed section.
    pub fn clone_subtree<K: AsRef<str>>(&self, keylist: &[K]) -> Result<ConfigNode> {
        Ok(self.section_at(keylist)?.deep_copy())
    }

    /// Returns a handle sharing the addressed section with this tree.
    pub fn subconfig<K: AsRef<str>>(&self, keylist: &[K]) -> Result<ConfigNode> {
        self.section_at(keylist)
    }

    pub fn has_option<K: AsRef<str>>(&self, keylist: &[K]) -> bool {
        match keylist.split_last() {
            Some((key, parents)) => self
                .section_at(parents)
                .map(|section| section.child(key.as_ref()).is_some())
                .unwrap_or(false),
            None => true,
        }
    }

    pub fn is_section<K: AsRef<str>>(&self, keylist: &[K]) -> bool {
        self.section_at(keylist).is_ok()
    }

    /// Number of immediate children.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Whether both handles point at the same section storage.
    pub fn same_section(&self, other: &ConfigNode) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    /// Snapshot of the immediate children in order. Subsections in the
    /// snapshot alias the tree's own sections.
    pub fn entries(&self) -> Vec<(String, Node)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, node)| (key.clone(), node.share()))
            .collect()
    }

    fn child(&self, key: &str) -> Option<Node> {
        self.entries.borrow().get(key).map(Node::share)
    }

    fn share(&self) -> ConfigNode {
        ConfigNode {
            entries: Rc::clone(&self.entries),
        }
    }

    fn deep_copy(&self) -> ConfigNode {
        let entries = self
            .entries
            .borrow()
            .iter()
            .map(|(key, node)| (key.clone(), node.deep_copy()))
            .collect();
        ConfigNode {
            entries: Rc::new(RefCell::new(entries)),
        }
    }

    fn section_at<K: AsRef<str>>(&self, keylist: &[K]) -> Result<ConfigNode> {
        self.descend(keylist, false)
    }

    /// Walks down `keylist`, creating missing sections when `update_tree` is set.
    fn descend<K: AsRef<str>>(&self, keylist: &[K], update_tree: bool) -> Result<ConfigNode> {
        let mut current = self.share();
        for (depth, key) in keylist.iter().enumerate() {
            let key = key.as_ref();
            let next = match current.child(key) {
                Some(Node::Section(section)) => section,
                Some(Node::Leaf(_)) => {
                    return Err(TreeConfigError::NotASection {
                        keylist: dotted(&keylist[..=depth]),
                    })
                }
                None if update_tree => {
                    let section = ConfigNode::new();
                    current
                        .entries
                        .borrow_mut()
                        .insert(key.to_string(), Node::Section(section.share()));
                    section
                }
                None => {
                    return Err(TreeConfigError::KeyNotFound {
                        keylist: dotted(&keylist[..=depth]),
                    })
                }
            };
            current = next;
        }
        Ok(current)
    }
}

impl PartialEq for ConfigNode {
    fn eq(&self, other: &Self) -> bool {
        self.same_section(other) || *self.entries.borrow() == *other.entries.borrow()
    }
}

impl fmt::Debug for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.borrow().iter()).finish()
    }
}

fn split_leaf<K: AsRef<str>>(keylist: &[K]) -> Result<(&[K], &str)> {
    match keylist.split_last() {
        Some((key, parents)) => Ok((parents, key.as_ref())),
        None => Err(TreeConfigError::EmptyKeylist),
    }
}

/// Joins a keylist with dots, the way references and the dotted convention spell it.
pub(crate) fn dotted<K: AsRef<str>>(keylist: &[K]) -> String {
    keylist
        .iter()
        .map(|key| key.as_ref())
        .collect::<Vec<&str>>()
        .join(".")
}
