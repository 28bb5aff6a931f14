//! File-level tests for reading and writing configurations
//!
//! Covers the three conventions, cross-references across sections, the
//! aliasing rules of subconfig and clone_subtree, and merging files.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use treeconf::{
    tree::ROOT, ConfigNode, Convention, ReadOptions, TreeConfigError, WriteOptions,
};

const NESTED: &str = "\
# Simulation settings
name = demo
[paths]
    root = /srv/sim
    input = %paths.root%/input     # resolved after parsing
    [output]
        dir = %paths.root%/out
        prefix = run_%name%
threads = 4
";

/// Write `content` to a file in a fresh temporary directory
fn write_config(content: &str, file_name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(file_name);
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_read_nested_file() {
    let (_dir, path) = write_config(NESTED, "sim.cfg");
    let config = ConfigNode::from_file(&path, &ReadOptions::default()).unwrap();

    assert_eq!(config.options(ROOT).unwrap(), vec!["name", "paths", "threads"]);
    assert_eq!(
        config.options(&["paths"]).unwrap(),
        vec!["root", "input", "output"]
    );
    assert_eq!(config.get_str(&["paths", "input"]).unwrap(), "/srv/sim/input");
    assert_eq!(
        config.get_str(&["paths", "output", "dir"]).unwrap(),
        "/srv/sim/out"
    );
    assert_eq!(
        config.get_str(&["paths", "output", "prefix"]).unwrap(),
        "run_demo"
    );
    assert_eq!(config.get_int(&["threads"]).unwrap(), 4);
}

#[test]
fn test_read_flat_file() {
    let content = "\
; top-level options come first
title = flat example
[server]
host = example.org
port = 8080
[client]
retries = 3 ; trailing comment
";
    let (_dir, path) = write_config(content, "flat.cfg");
    let options = ReadOptions::default()
        .with_convention(Convention::Flat)
        .with_comment_char(';');
    let config = ConfigNode::from_file(&path, &options).unwrap();

    assert_eq!(
        config.options(ROOT).unwrap(),
        vec!["title", "server", "client"]
    );
    assert_eq!(config.get_str(&["server", "host"]).unwrap(), "example.org");
    assert_eq!(config.get_int(&["server", "port"]).unwrap(), 8080);
    assert_eq!(config.get_str(&["client", "retries"]).unwrap(), "3");
}

#[test]
fn test_read_dotted_file() {
    let content = "\
model.name = chimere
model.grid.nx = 100
model.grid.ny = 80
output = %model.name%.nc
";
    let (_dir, path) = write_config(content, "dotted.cfg");
    let options = ReadOptions::default().with_convention(Convention::Dotted);
    let config = ConfigNode::from_file(&path, &options).unwrap();

    assert_eq!(
        config.suboptions(),
        vec![
            vec!["model", "name"],
            vec!["model", "grid", "nx"],
            vec!["model", "grid", "ny"],
            vec!["output"],
        ]
    );
    assert_eq!(config.get_str(&["output"]).unwrap(), "chimere.nc");
}

#[test]
fn test_indentation_error_reports_line() {
    let content = "[a]\n    x = 1\n      y = 2\n";
    let (_dir, path) = write_config(content, "bad.cfg");

    match ConfigNode::from_file(&path, &ReadOptions::default()) {
        Err(TreeConfigError::Indentation { line_number, .. }) => assert_eq!(line_number, 3),
        other => panic!("expected an indentation error, got {:?}", other),
    }
}

#[test]
fn test_circular_references_in_file() {
    let (_dir, path) = write_config("a = %b%\nb = %a%\n", "loop.cfg");
    let result = ConfigNode::from_file(&path, &ReadOptions::default());
    assert!(matches!(result, Err(TreeConfigError::CrossReference { .. })));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = ConfigNode::from_file(dir.path().join("absent.cfg"), &ReadOptions::default());
    assert!(matches!(result, Err(TreeConfigError::Io(_))));
}

#[test]
fn test_nested_round_trip() {
    let (dir, path) = write_config(NESTED, "sim.cfg");
    let config = ConfigNode::from_file(&path, &ReadOptions::default()).unwrap();

    let copy = dir.path().join("copy.cfg");
    config.write_to_file(&copy, &WriteOptions::default()).unwrap();
    let reread = ConfigNode::from_file(&copy, &ReadOptions::default()).unwrap();

    assert_eq!(reread, config);
    assert_eq!(
        fs::read_to_string(&copy).unwrap(),
        config.to_text(&WriteOptions::default())
    );
}

#[test]
fn test_convert_nested_to_dotted() {
    let (dir, path) = write_config(NESTED, "sim.cfg");
    let config = ConfigNode::from_file(&path, &ReadOptions::default()).unwrap();

    let dotted = dir.path().join("sim.dotted");
    let write = WriteOptions::default().with_convention(Convention::Dotted);
    config.write_to_file(&dotted, &write).unwrap();

    let read = ReadOptions::default().with_convention(Convention::Dotted);
    let reread = ConfigNode::from_file(&dotted, &read).unwrap();
    assert_eq!(reread, config);
    assert!(fs::read_to_string(&dotted)
        .unwrap()
        .contains("paths.output.dir = /srv/sim/out\n"));
}

#[test]
fn test_comment_characters_survive_round_trip() {
    let config = ConfigNode::new();
    config.set(&["style", "color"], "#336699", true).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("style.cfg");
    config.write_to_file(&path, &WriteOptions::default()).unwrap();

    let reread = ConfigNode::from_file(&path, &ReadOptions::default()).unwrap();
    assert_eq!(reread.get_str(&["style", "color"]).unwrap(), "#336699");
}

#[test]
fn test_write_replaces_existing_file() {
    let (_dir, path) = write_config("old = 1\n", "app.cfg");
    let config = ConfigNode::new();
    config.set(&["new"], "2", false).unwrap();
    config.write_to_file(&path, &WriteOptions::default()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "new = 2\n");
}

#[test]
fn test_subconfig_edits_reach_the_file_tree() {
    let (_dir, path) = write_config(NESTED, "sim.cfg");
    let config = ConfigNode::from_file(&path, &ReadOptions::default()).unwrap();

    let output = config.subconfig(&["paths", "output"]).unwrap();
    output.set(&["dir"], "/tmp/out", false).unwrap();
    assert_eq!(config.get_str(&["paths", "output", "dir"]).unwrap(), "/tmp/out");

    let copy = config.clone_subtree(&["paths"]).unwrap();
    copy.set(&["root"], "/elsewhere", false).unwrap();
    assert_eq!(config.get_str(&["paths", "root"]).unwrap(), "/srv/sim");
}

#[test]
fn test_merge_files() {
    let (_dir, base_path) = write_config("option1 = 1\n[section1]\n    option2 = 2\n", "base.cfg");
    let (_other_dir, other_path) = write_config("option2 = 3\noption3 = 3\n", "other.cfg");

    let base = ConfigNode::from_file(&base_path, &ReadOptions::default()).unwrap();
    let other = ConfigNode::from_file(&other_path, &ReadOptions::default()).unwrap();
    base.merge(&other, &["section1"], false).unwrap();

    assert_eq!(base.get_str(&["option1"]).unwrap(), "1");
    assert_eq!(
        base.options(&["section1"]).unwrap(),
        vec!["option2", "option3"]
    );
    assert_eq!(base.get_str(&["section1", "option2"]).unwrap(), "3");
    assert_eq!(base.get_str(&["section1", "option3"]).unwrap(), "3");
}

#[test]
fn test_read_file_into_existing_tree() {
    let (_dir, path) = write_config("[db]\n    host = %defaults.host%\n", "db.cfg");
    let config = ConfigNode::new();
    config.set(&["defaults", "host"], "localhost", true).unwrap();

    config.read_file(&path, &ReadOptions::default()).unwrap();
    assert_eq!(config.get_str(&["db", "host"]).unwrap(), "localhost");
}
