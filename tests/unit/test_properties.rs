//! Property tests for the configuration tree and its text conventions

use proptest::prelude::*;
use treeconf::{tree::ROOT, ConfigNode, Convention, ReadOptions, WriteOptions};

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

/// Values without comment, reference, bracket or assignment characters and
/// without surrounding whitespace.
fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_/.:+-]{0,12}"
}

fn keylist() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(key(), 1..4)
}

/// Builds a tree from assignments, skipping those that would descend
/// through an existing option.
fn build(assignments: &[(Vec<String>, String)]) -> ConfigNode {
    let config = ConfigNode::new();
    for (keylist, value) in assignments {
        let _ = config.set(keylist, value.as_str(), true);
    }
    config
}

fn reparse(config: &ConfigNode, convention: Convention, indentation: usize) -> ConfigNode {
    let write = WriteOptions::default()
        .with_convention(convention)
        .with_indentation(indentation);
    let read = ReadOptions::default()
        .with_convention(convention)
        .with_indentation(indentation);
    let reread = ConfigNode::new();
    reread.read_str(&config.to_text(&write), &read).unwrap();
    reread
}

proptest! {
    #[test]
    fn prop_set_then_get_returns_value(keylist in keylist(), value in value()) {
        let config = ConfigNode::new();
        config.set(&keylist, value.as_str(), true).unwrap();
        prop_assert_eq!(config.get_str(&keylist).unwrap(), value);
    }

    #[test]
    fn prop_options_keep_first_insertion_order(keys in prop::collection::vec(key(), 1..12)) {
        let config = ConfigNode::new();
        let mut expected: Vec<String> = Vec::new();
        for (index, key) in keys.iter().enumerate() {
            config.set(&[key.as_str()], index.to_string(), false).unwrap();
            if !expected.contains(key) {
                expected.push(key.clone());
            }
        }
        prop_assert_eq!(config.options(ROOT).unwrap(), expected);
    }

    #[test]
    fn prop_nested_text_round_trips(
        assignments in prop::collection::vec((keylist(), value()), 1..16),
        indentation in 1usize..6,
    ) {
        let config = build(&assignments);
        let reread = reparse(&config, Convention::Nested, indentation);
        prop_assert_eq!(&reread, &config);
        prop_assert_eq!(
            reread.to_text(&WriteOptions::default()),
            config.to_text(&WriteOptions::default())
        );
    }

    #[test]
    fn prop_dotted_text_round_trips(
        assignments in prop::collection::vec((keylist(), value()), 1..16),
    ) {
        let config = build(&assignments);
        prop_assert_eq!(reparse(&config, Convention::Dotted, 0), config);
    }

    #[test]
    fn prop_clone_is_independent(
        assignments in prop::collection::vec((keylist(), value()), 1..8),
        extra in key(),
    ) {
        let config = build(&assignments);
        let copy = config.clone_subtree(ROOT).unwrap();
        prop_assert_eq!(&copy, &config);

        let key = format!("{}_COPY", extra);
        copy.set(&[key.as_str()], "1", false).unwrap();
        prop_assert!(!config.has_option(&[key.as_str()]));
    }
}
