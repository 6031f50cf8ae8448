//! References between configuration paths.

use std::fmt;
use std::sync::Arc;

use cascade_selector::{IntoSelector, Selector};

use crate::error::Result;
use crate::value::Value;

type Transform = dyn Fn(Value) -> Value + Send + Sync;

/// A value that resolves by looking up another path and transforming the result.
///
/// The target path is resolved relative to the scope root of the rule that
/// holds the reference, so a reference keeps pointing at the same place when
/// its configuration is merged under a new prefix.
#[derive(Clone)]
pub struct Ref {
    target: Selector,
    transform: Option<Arc<Transform>>,
}

impl Ref {
    /// Reference `path`, returning the looked-up value unchanged.
    pub fn new(path: impl IntoSelector) -> Result<Self> {
        Ok(Self::to(path.into_selector()?))
    }

    pub fn to(target: Selector) -> Self {
        Self {
            target,
            transform: None,
        }
    }

    /// Apply `f` to the looked-up value.
    pub fn map(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        let next: Arc<Transform> = match self.transform.take() {
            Some(prev) => Arc::new(move |v: Value| f(prev(v))),
            None => Arc::new(f),
        };
        self.transform = Some(next);
        self
    }

    pub fn target(&self) -> &Selector {
        &self.target
    }

    pub fn apply(&self, value: Value) -> Value {
        match &self.transform {
            Some(f) => f(value),
            None => value,
        }
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("target", &self.target.to_string())
            .field("transformed", &self.transform.is_some())
            .finish()
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_without_transform() {
        let r = Ref::new("x.y").unwrap();
        assert_eq!(r.apply(Value::Int(3)), Value::Int(3));
        assert_eq!(r.to_string(), "Ref(x.y)");
    }

    #[test]
    fn test_transforms_compose_in_order() {
        let r = Ref::new("x")
            .unwrap()
            .map(|v| Value::Int(v.as_i64().unwrap_or(0) + 1))
            .map(|v| Value::Int(v.as_i64().unwrap_or(0) * 10));
        assert_eq!(r.apply(Value::Int(1)), Value::Int(20));
    }
}
