//! Cascade Config - selector-based hierarchical configuration
//!
//! Rules bind values to selector paths (`encoder.blocks[0].width`,
//! `__.activation`, `layers[1:]`). Looking a path up collects every rule
//! whose selector matches it, groups them by key and keeps the most
//! specific rule per key, much like a CSS cascade. On top of that:
//!
//! - references ([`Ref`]) look up another path, relative to where the
//!   referring rule was defined,
//! - forward hooks ([`ForwardHook`]) hold values captured when the built
//!   object first runs,
//! - `populate` fills repeated sub-structures position by position,
//! - [`Config::build_object`] turns resolved values into built objects.
//!
//! ```
//! use cascade_config::{Config, Ref, Value};
//!
//! let config = Config::new()
//!     .select("x").select("y").assign(100)?
//!     .select("a").select("b").assign(Ref::new("x.y")?.map(|v| {
//!         Value::Int(v.as_i64().unwrap_or(0) + 1)
//!     }))?;
//! assert_eq!(config.get("a.b")?, Value::Int(101));
//! # Ok::<(), cascade_config::ConfigError>(())
//! ```

pub mod config;
pub mod error;
pub mod hook;
pub mod loader;
pub mod logging;
pub mod object;
pub mod reference;
pub mod rule;
pub mod value;
pub mod warn_once;

pub use config::{Config, MergeOptions, Populator};
pub use error::{ConfigError, Result};
pub use hook::ForwardHook;
pub use loader::{load_layers, RuleFile};
pub use object::{
    match_signature, Arguments, Buildable, ClassRef, Factory, FromConfig, Module, Signature,
};
pub use reference::Ref;
pub use rule::{Resolution, Rule, RuleValue};
pub use value::Value;

pub use cascade_selector::{
    parse_selector, Index, IntoSelector, Segment, Selector, SelectorError, INDEX_LIMIT,
};
