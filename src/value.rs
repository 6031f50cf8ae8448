//! Resolved values.
//!
//! [`Value`] is the closed set of shapes a resolved parameter can take. The
//! data variants carry literals; the remaining variants drive
//! materialization (see [`Config::build_object`](crate::Config::build_object)).

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::object::{Buildable, ClassRef, Factory, Module};

/// A resolved configuration value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An ordered sequence; materialized element-wise.
    List(Vec<Value>),
    /// An instance that knows how to construct itself from a configuration.
    Template(Arc<dyn Buildable>),
    /// A type that knows how to construct itself from a configuration.
    Class(ClassRef),
    /// An already-built object; passed through unchanged.
    Module(Module),
    /// A plain callable whose declared parameters are resolved and bound by name.
    Factory(Factory),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Module> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as JSON. Non-data variants become descriptive strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => json!(s),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            other => json!(other.to_string()),
        }
    }

    /// Convert a TOML value (rule files).
    pub fn from_toml(value: toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::Str(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
            toml::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_toml).collect())
            }
            table @ toml::Value::Table(_) => Value::Str(table.to_string()),
        }
    }
}

impl PartialEq for Value {
    /// Data variants compare structurally; object variants by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => Arc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a.ptr_eq(b),
            (Value::Factory(a), Value::Factory(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Template(t) => write!(f, "<template {:?}>", t),
            Value::Class(c) => write!(f, "<class {}>", c.name()),
            Value::Module(m) => write!(f, "<module {}>", m.type_name()),
            Value::Factory(factory) => write!(f, "<factory {}>", factory.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Module> for Value {
    fn from(v: Module) -> Self {
        Value::Module(v)
    }
}

impl From<Factory> for Value {
    fn from(v: Factory) -> Self {
        Value::Factory(v)
    }
}

impl From<ClassRef> for Value {
    fn from(v: ClassRef) -> Self {
        Value::Class(v)
    }
}

impl From<Arc<dyn Buildable>> for Value {
    fn from(v: Arc<dyn Buildable>) -> Self {
        Value::Template(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_literals() {
        let v = Value::from(vec![Value::Int(1), Value::from("a"), Value::Float(0.5)]);
        assert_eq!(v.to_string(), r#"[1, "a", 0.5]"#);
    }

    #[test]
    fn test_to_json() {
        let v = Value::from(vec![Value::Int(1), Value::Null, Value::Bool(true)]);
        assert_eq!(v.to_json(), json!([1, null, true]));
    }

    #[test]
    fn test_from_toml() {
        let parsed: toml::Value = toml::from_str("x = [1, 2.5, \"s\"]").unwrap();
        let x = parsed.get("x").cloned().unwrap();
        assert_eq!(
            Value::from_toml(x),
            Value::List(vec![Value::Int(1), Value::Float(2.5), Value::from("s")])
        );
    }

    #[test]
    fn test_factory_equality_is_identity() {
        let a = Factory::new("f", &[], |_| Ok(Value::Null));
        let b = Factory::new("f", &[], |_| Ok(Value::Null));
        assert_eq!(Value::from(a.clone()), Value::from(a));
        assert_ne!(
            Value::from(b),
            Value::from(Factory::new("f", &[], |_| Ok(Value::Null)))
        );
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(3.0).as_i64(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
    }
}
