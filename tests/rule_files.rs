//! Rule file loading and layering tests

use std::fs;
use std::path::PathBuf;

use cascade_config::{load_layers, ConfigError, RuleFile, Value};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

const BASE: &str = r#"
[[rule]]
path = "encoder.width"
value = 64

[[rule]]
path = "decoder.width"
ref = "encoder.width"

[[rule]]
path = "__.activation"
value = "relu"
default = true

[[populate]]
context = "encoder.blocks"
path = "kernel"
values = [3, 5, 7]
"#;

const OVERRIDE: &str = r#"
[[rule]]
path = "encoder.width"
value = 128

[[rule]]
path = "encoder.blocks[1].kernel"
value = 9
"#;

#[test]
fn test_single_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "base.toml", BASE);
    let config = RuleFile::from_file(&path).unwrap().to_config().unwrap();

    assert_eq!(config.get("encoder.width").unwrap(), Value::Int(64));
    assert_eq!(config.get("decoder.width").unwrap(), Value::Int(64));
    assert_eq!(
        config.get("decoder.head.activation").unwrap(),
        Value::from("relu")
    );
    assert_eq!(
        config.get("encoder.blocks[2].kernel").unwrap(),
        Value::Int(7)
    );
}

#[test]
fn test_later_layers_win() {
    let dir = TempDir::new().unwrap();
    let base = write(&dir, "base.toml", BASE);
    let over = write(&dir, "override.toml", OVERRIDE);
    let config = load_layers(&[base, over], false).unwrap();

    assert_eq!(config.get("encoder.width").unwrap(), Value::Int(128));
    // the reference follows the override
    assert_eq!(config.get("decoder.width").unwrap(), Value::Int(128));
    assert_eq!(
        config.get("encoder.blocks[1].kernel").unwrap(),
        Value::Int(9)
    );
    assert_eq!(
        config.get("encoder.blocks[0].kernel").unwrap(),
        Value::Int(3)
    );
}

#[test]
fn test_first_layer_as_default() {
    let dir = TempDir::new().unwrap();
    let over = write(&dir, "override.toml", OVERRIDE);
    let base = write(&dir, "base.toml", BASE);

    // base comes second but only the first layer is demoted
    let config = load_layers(&[over.clone(), base.clone()], true).unwrap();
    assert_eq!(config.get("encoder.width").unwrap(), Value::Int(64));

    let config = load_layers(&[base, over], true).unwrap();
    assert_eq!(config.get("encoder.width").unwrap(), Value::Int(128));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = load_layers(&[dir.path().join("absent.toml")], false);
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_invalid_rule_reports_index() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "bad.toml",
        "[[rule]]\npath = \"a\"\nvalue = 1\n\n[[rule]]\npath = \"b\"\n",
    );
    match RuleFile::from_file(&path) {
        Err(ConfigError::Validation(msg)) => assert!(msg.contains("rule 1"), "{}", msg),
        other => panic!("expected a validation error, got {:?}", other),
    }
}
