//! Deferred forward hooks
//!
//! A [`ForwardHook`] holds a value that is unknown at configuration time and
//! is captured from the first forward pass of the module it belongs to
//! (for example the feature count of the first input). Clones share state,
//! so the rule that stores the hook and the trigger that runs it observe the
//! same value.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ConfigError, Result};
use crate::value::Value;

type HookFn = dyn Fn(&Value) -> Value + Send + Sync;

#[derive(Default)]
struct HookState {
    has_run: bool,
    value: Option<Value>,
}

struct HookInner {
    hook: Box<HookFn>,
    first_only: bool,
    state: Mutex<HookState>,
}

/// A value produced by running a hook on the trigger argument.
#[derive(Clone)]
pub struct ForwardHook {
    inner: Arc<HookInner>,
}

impl ForwardHook {
    /// A hook that runs on every trigger.
    pub fn new(hook: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::build(hook, false)
    }

    /// A hook that runs on the first trigger only; later triggers keep the cached value.
    pub fn first_only(hook: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::build(hook, true)
    }

    fn build(hook: impl Fn(&Value) -> Value + Send + Sync + 'static, first_only: bool) -> Self {
        Self {
            inner: Arc::new(HookInner {
                hook: Box::new(hook),
                first_only,
                state: Mutex::new(HookState::default()),
            }),
        }
    }

    pub fn is_first_only(&self) -> bool {
        self.inner.first_only
    }

    /// Run the hook on `x` and cache its result.
    pub fn call(&self, x: &Value) {
        if self.inner.first_only && self.has_run() {
            return;
        }
        let value = (self.inner.hook)(x);
        let mut state = self.state();
        state.value = Some(value);
        state.has_run = true;
    }

    pub fn has_run(&self) -> bool {
        self.state().has_run
    }

    /// The cached value, or `None` if the hook has not run.
    pub fn try_value(&self) -> Option<Value> {
        self.state().value.clone()
    }

    /// The cached value. Fails with [`ConfigError::HookNotRun`] before the first run.
    pub fn value(&self) -> Result<Value> {
        self.try_value().ok_or_else(|| ConfigError::HookNotRun {
            key: "<unbound>".to_string(),
        })
    }

    pub fn ptr_eq(&self, other: &ForwardHook) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn state(&self) -> MutexGuard<'_, HookState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ForwardHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ForwardHook")
            .field("first_only", &self.inner.first_only)
            .field("has_run", &state.has_run)
            .field("value", &state.value)
            .finish()
    }
}

impl fmt::Display for ForwardHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_value() {
            Some(v) => write!(f, "ForwardHook({})", v),
            None => write!(f, "ForwardHook(<not run>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len_hook(x: &Value) -> Value {
        Value::from(x.as_list().map_or(0, <[Value]>::len))
    }

    #[test]
    fn test_value_before_run_fails() {
        let hook = ForwardHook::first_only(len_hook);
        assert!(!hook.has_run());
        assert!(matches!(hook.value(), Err(ConfigError::HookNotRun { .. })));
    }

    #[test]
    fn test_first_only_keeps_first_value() {
        let hook = ForwardHook::first_only(len_hook);
        hook.call(&Value::from(vec![1, 2, 3]));
        hook.call(&Value::from(vec![1]));
        assert_eq!(hook.value().unwrap(), Value::Int(3));
    }

    #[test]
    fn test_every_run_updates_value() {
        let hook = ForwardHook::new(len_hook);
        hook.call(&Value::from(vec![1, 2, 3]));
        hook.call(&Value::from(vec![1]));
        assert_eq!(hook.value().unwrap(), Value::Int(1));
    }

    #[test]
    fn test_clones_share_state() {
        let hook = ForwardHook::first_only(len_hook);
        let shared = hook.clone();
        hook.call(&Value::from(vec![0, 0]));
        assert!(shared.ptr_eq(&hook));
        assert_eq!(shared.value().unwrap(), Value::Int(2));
    }
}
