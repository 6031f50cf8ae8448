//! Error types for configuration resolution and materialization.

use cascade_selector::SelectorError;

/// Errors raised while building, resolving or materializing a [`Config`](crate::Config).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An operation that needs an active selector context was called without one.
    #[error("cannot {operation} without a selector context")]
    NoContext { operation: &'static str },

    /// No rule matches the requested path and no default was supplied.
    #[error("no keys match for {path} in {config}")]
    NoMatch { path: String, config: String },

    /// Several keys matched and the caller asked for a single value.
    #[error("multiple keys match {path} ({keys:?})")]
    AmbiguousMatch { path: String, keys: Vec<String> },

    /// A deferred hook was read before its trigger ran.
    #[error("hook for {key:?} has not been run yet; evaluate the module before reading the value")]
    HookNotRun { key: String },

    /// Indexed rules left holes between position 0 and the highest position.
    #[error("missing indices {missing:?} for key {key:?}")]
    GapInIndices { key: String, missing: Vec<usize> },

    /// A factory or buildable rejected its resolved arguments.
    #[error("failed to build {target}: {message}")]
    Build { target: String, message: String },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("failed to read rule file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse rule file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid rule file: {0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn build(target: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Build {
            target: target.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
