//! Unit tests for typed access to option values

use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;
use treeconf::{
    conversion::{
        string_to_bool, string_to_int, string_to_stringlist, ArrayDtype, NumericArray,
    },
    convert, ConfigNode, Conversion, ConversionOptions, ConvertedValue, ReadOptions, Severity,
    TreeConfigError,
};

fn sample() -> ConfigNode {
    let config = ConfigNode::new();
    config
        .read_str(
            "\
[run]
    steps = 6 * 24
    dt = 3600 / 7
    verbose = On
    species = O3  NO2   PM10
    level = WARNING
    start = 2015-07-01
    stop = 2015-07-02_18-00
",
            &ReadOptions::default(),
        )
        .unwrap();
    config
}

#[test]
fn test_documented_conversions() {
    assert!(string_to_bool("On").unwrap());
    assert!(!string_to_bool("0").unwrap());
    assert_eq!(string_to_int("-10", false).unwrap(), -10);
    assert_eq!(
        string_to_stringlist("a  bc def   g", None, None).unwrap(),
        vec!["a", "bc", "def", "g"]
    );
}

#[test]
fn test_typed_getters() {
    let config = sample();

    assert!(config.get_bool(&["run", "verbose"]).unwrap());
    assert_eq!(
        config.get_stringlist(&["run", "species"]).unwrap(),
        vec!["O3", "NO2", "PM10"]
    );
    assert_eq!(
        config.get_log_level(&["run", "level"]).unwrap(),
        Severity::Warning
    );
    assert_eq!(
        config.get_datetime(&["run", "start"]).unwrap(),
        NaiveDate::from_ymd_opt(2015, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    );
}

#[test]
fn test_expressions_require_eval() {
    let config = sample();

    assert!(matches!(
        config.get_int(&["run", "steps"]),
        Err(TreeConfigError::InvalidValue { conversion: "int", .. })
    ));

    let options = ConversionOptions::default().with_eval();
    assert_eq!(
        config.get(&["run", "steps"], Conversion::Int, &options).unwrap(),
        ConvertedValue::Int(144)
    );
    let dt = config
        .get(&["run", "dt"], Conversion::Float, &options)
        .unwrap()
        .as_float()
        .unwrap();
    assert!((dt - 3600.0 / 7.0).abs() < 1e-9);
}

#[test]
fn test_datetime_with_preset_format() {
    let config = sample();
    let options = ConversionOptions::default().with_datetime_format("polyphemus_datetime");

    let stop = config
        .get_tagged(&["run", "stop"], "datetime", &options)
        .unwrap();
    assert_eq!(
        stop,
        ConvertedValue::DateTime(
            NaiveDate::from_ymd_opt(2015, 7, 2)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap()
        )
    );
}

#[test]
fn test_unknown_tag_is_unsupported() {
    let config = sample();
    let result = config.get_tagged(&["run", "steps"], "complex", &ConversionOptions::default());
    assert!(matches!(
        result,
        Err(TreeConfigError::UnsupportedConversion(tag)) if tag == "complex"
    ));
}

#[test]
fn test_bad_values_are_invalid() {
    let options = ConversionOptions::default();
    for (value, tag) in [
        ("maybe", "bool"),
        ("ten", "int"),
        ("1.5.2", "float"),
        ("verbose", "log_level"),
        ("2015-13-01", "datetime"),
    ] {
        assert!(
            matches!(convert(value, tag, &options), Err(TreeConfigError::InvalidValue { .. })),
            "{} as {} should be rejected",
            value,
            tag
        );
    }
}

#[test]
fn test_binary_array_option() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("field.bin");
    let values: [f32; 4] = [1.0, 2.5, -3.0, 4.25];
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    fs::write(&path, bytes).unwrap();

    let config = ConfigNode::new();
    config
        .set(&["input", "field"], path.to_string_lossy().into_owned(), true)
        .unwrap();

    let options = ConversionOptions::default()
        .with_dtype(ArrayDtype::F32)
        .with_offset(4)
        .with_count(2);
    let array = config
        .get_tagged(&["input", "field"], "np_fromfile", &options)
        .unwrap();
    assert_eq!(array, ConvertedValue::Array(NumericArray::F32(vec![2.5, -3.0])));
}
