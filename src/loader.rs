//! Rule files
//!
//! Rules can be written down as TOML and layered:
//!
//! ```toml
//! [[rule]]
//! path = "encoder.layers[0].out_features"
//! value = 64
//!
//! [[rule]]
//! path = "decoder.in_features"
//! ref = "encoder.layers[0].out_features"
//!
//! [[populate]]
//! context = "blocks"
//! path = "width"
//! values = [8, 16, 32]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cascade_selector::{parse_selector, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{MergeOptions, Populator};
use crate::error::{ConfigError, Result};
use crate::reference::Ref;
use crate::rule::RuleValue;
use crate::value::Value;
use crate::Config;

/// A single `[[rule]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Where the rule applies, including the key (`a.b.key`)
    pub path: String,

    /// Literal value; mutually exclusive with `ref`
    pub value: Option<toml::Value>,

    /// Path to look the value up from; mutually exclusive with `value`
    #[serde(rename = "ref")]
    pub reference: Option<String>,

    /// Register with default specificity
    #[serde(default)]
    pub default: bool,
}

/// A single `[[populate]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulateEntry {
    /// The repeated structure (`blocks`, `blocks[1:]`)
    pub context: String,

    /// Path under each element, including the key
    pub path: String,

    /// One value per position
    pub values: Vec<toml::Value>,

    pub length: Option<usize>,
}

/// A parsed rule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleEntry>,

    #[serde(default, rename = "populate")]
    pub populate: Vec<PopulateEntry>,
}

impl RuleFile {
    /// Load and parse a rule file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a rule file from a TOML string
    pub fn parse(s: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(s)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            // Rule: exactly one of value / ref
            match (&rule.value, &rule.reference) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::Validation(format!(
                        "rule {}: cannot specify both 'value' and 'ref'",
                        i
                    )))
                }
                (None, None) => {
                    return Err(ConfigError::Validation(format!(
                        "rule {}: one of 'value' or 'ref' is required",
                        i
                    )))
                }
                _ => {}
            }

            // Rule: the path names a key
            if parse_path(&rule.path, i, "path")?.is_none() {
                return Err(ConfigError::Validation(format!("rule {}: 'path' is empty", i)));
            }
            if let Some(reference) = &rule.reference {
                parse_path(reference, i, "ref")?;
            }
        }

        for (i, entry) in self.populate.iter().enumerate() {
            let context = parse_path(&entry.context, i, "context")?;
            let path = parse_path(&entry.path, i, "path")?;
            if context.is_none() || path.is_none() {
                return Err(ConfigError::Validation(format!(
                    "populate {}: 'context' and 'path' must not be empty",
                    i
                )));
            }
        }

        Ok(())
    }

    /// Register every rule of this file on top of `config`.
    pub fn apply(&self, config: &Config) -> Result<Config> {
        let mut out = config.root();
        for rule in &self.rules {
            let value = match (&rule.value, &rule.reference) {
                (_, Some(reference)) => RuleValue::Ref(Ref::new(reference)?),
                (Some(value), None) => RuleValue::Literal(Value::from_toml(value.clone())),
                (None, None) => continue,
            };
            if rule.default {
                out.set_default(&rule.path, value)?;
            } else {
                out.set(&rule.path, value)?;
            }
        }
        for entry in &self.populate {
            let values = entry.values.iter().cloned().map(Value::from_toml);
            out = out
                .with_selector(&entry.context)?
                .populate(&entry.path, Populator::values(values), entry.length)?;
        }
        Ok(out)
    }

    pub fn to_config(&self) -> Result<Config> {
        self.apply(&Config::new())
    }
}

fn parse_path(path: &str, i: usize, field: &str) -> Result<Selector> {
    parse_selector(path).map_err(|e| {
        ConfigError::Validation(format!("entry {}: invalid {} '{}': {}", i, field, path, e))
    })
}

/// Load rule files in order; later files win ties.
///
/// With `first_as_default` the first file only provides defaults.
pub fn load_layers(paths: &[PathBuf], first_as_default: bool) -> Result<Config> {
    let mut config = Config::new();
    for (i, path) in paths.iter().enumerate() {
        let layer = RuleFile::from_file(path)?.to_config()?;
        let options = MergeOptions {
            as_default: first_as_default && i == 0,
            prepend: false,
        };
        debug!(path = %path.display(), rules = layer.rules().len(), "loaded rule file");
        config = config.merge_with(Selector::none(), &layer, options)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_and_populate() {
        let file = RuleFile::parse(
            r#"
            [[rule]]
            path = "a.b"
            value = 3

            [[rule]]
            path = "c"
            ref = "a.b"
            default = true

            [[populate]]
            context = "blocks"
            path = "width"
            values = [1, 2]
            "#,
        )
        .unwrap();
        assert_eq!(file.rules.len(), 2);
        assert!(file.rules[1].default);
        assert_eq!(file.populate[0].values.len(), 2);

        let config = file.to_config().unwrap();
        assert_eq!(config.get("c").unwrap(), Value::Int(3));
        assert_eq!(config.get("blocks[1].width").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_value_and_ref_are_exclusive() {
        let err = RuleFile::parse(
            r#"
            [[rule]]
            path = "a"
            value = 1
            ref = "b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("rule 0")));
    }

    #[test]
    fn test_missing_value_rejected() {
        let err = RuleFile::parse("[[rule]]\npath = \"a\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_bad_path_rejected() {
        let err = RuleFile::parse("[[rule]]\npath = \"a..b\"\nvalue = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("a..b")));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RuleFile::parse("[[rule]\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
