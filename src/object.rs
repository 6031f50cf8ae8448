//! Materializable objects
//!
//! The capability interfaces a resolved value can expose to
//! [`Config::build_object`](crate::Config::build_object):
//!
//! - [`Buildable`]: an instance (a template) that constructs the final
//!   object from the configuration rooted at its own path.
//! - [`FromConfig`] / [`ClassRef`]: the same capability on a type.
//! - [`Module`]: an already-built object, passed through unchanged.
//! - [`Factory`]: a plain callable with a declared [`Signature`]; its
//!   parameters are resolved from the configuration and bound by name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::value::Value;
use crate::Config;

/// An instance that can construct an object from a configuration.
pub trait Buildable: fmt::Debug + Send + Sync {
    fn from_config(&self, config: &Config) -> Result<Value>;
}

/// A type that can construct an instance of itself from a configuration.
pub trait FromConfig {
    fn from_config(config: &Config) -> Result<Value>;
}

/// A reference to a [`FromConfig`] type.
#[derive(Clone, Copy)]
pub struct ClassRef {
    name: &'static str,
    build: fn(&Config) -> Result<Value>,
}

impl ClassRef {
    pub fn of<T: FromConfig>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            build: T::from_config,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn from_config(&self, config: &Config) -> Result<Value> {
        (self.build)(config)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.name).finish()
    }
}

/// A built object.
#[derive(Clone)]
pub struct Module {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Module {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn ptr_eq(&self, other: &Module) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Module").field(&self.type_name).finish()
    }
}

/// Declared parameters of a [`Factory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<String>,
    /// Accepts any keyword argument (`**kwargs`).
    pub accepts_any: bool,
}

impl Signature {
    pub fn new(params: &[&str]) -> Self {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            accepts_any: false,
        }
    }

    pub fn variadic() -> Self {
        Self {
            params: Vec::new(),
            accepts_any: true,
        }
    }
}

/// Keep the available values whose names the signature declares.
///
/// Variadic signatures take everything. Otherwise the result follows the
/// signature's declaration order.
pub fn match_signature(
    signature: &Signature,
    mut available: IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    if signature.accepts_any {
        return available;
    }
    signature
        .params
        .iter()
        .filter_map(|name| available.shift_remove(name).map(|v| (name.clone(), v)))
        .collect()
}

/// Keyword arguments passed to a [`Factory`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }

    pub fn require(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| ConfigError::build(name, "missing required argument"))
    }

    pub fn require_i64(&self, name: &str) -> Result<i64> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| ConfigError::build(name, "expected an integer"))
    }

    pub fn i64_or(&self, name: &str, default: i64) -> i64 {
        self.get(name).and_then(Value::as_i64).unwrap_or(default)
    }
}

type FactoryFn = dyn Fn(Arguments) -> Result<Value> + Send + Sync;

/// A plain callable with a declared signature.
#[derive(Clone)]
pub struct Factory {
    name: String,
    signature: Signature,
    func: Arc<FactoryFn>,
}

impl Factory {
    pub fn new(
        name: impl Into<String>,
        params: &[&str],
        func: impl Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::with_signature(name, Signature::new(params), func)
    }

    /// A factory accepting any keyword argument.
    pub fn variadic(
        name: impl Into<String>,
        func: impl Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::with_signature(name, Signature::variadic(), func)
    }

    pub fn with_signature(
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn call(&self, args: Arguments) -> Result<Value> {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &Factory) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}
