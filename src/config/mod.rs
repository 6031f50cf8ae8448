//! The configuration aggregate
//!
//! A [`Config`] is a handle onto three things:
//! - an ordered rule list, shared copy-on-write between handles,
//! - a table of named sub-configurations ("refs"),
//! - a context path, local to the handle.
//!
//! Path-building calls (`select`, `index`, `with_selector`) return new
//! handles that share the rule list. Terminal calls (`assign`, `merge`,
//! `populate`, hook registration) return a handle rooted at the top with
//! the extended rule list; the handle they were called on is not changed.

mod build;
mod populate;
mod resolve;

pub use populate::Populator;

use std::fmt;
use std::sync::Arc;

use cascade_selector::{Index, IntoSelector, Segment, Selector};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::hook::ForwardHook;
use crate::reference::Ref;
use crate::rule::{MatchMode, Resolution, Rule, RuleValue};
use crate::value::Value;

/// How [`Config::merge_with`] inserts the merged rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Register every merged rule with default specificity.
    pub as_default: bool,
    /// Insert before the existing rules, so existing rules win ties.
    pub prepend: bool,
}

/// A hierarchical, selector-based configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    rules: Arc<Vec<Arc<Rule>>>,
    refs: Arc<IndexMap<String, Config>>,
    context: Selector,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &Selector {
        &self.context
    }

    /// Rules in registration order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    fn derive(&self, context: Selector) -> Config {
        Config {
            rules: Arc::clone(&self.rules),
            refs: Arc::clone(&self.refs),
            context,
        }
    }

    /// The same rules with `context` as the context.
    pub fn rooted_at(&self, context: Selector) -> Config {
        self.derive(context)
    }

    /// The same rules with no context.
    pub fn root(&self) -> Config {
        self.derive(Selector::none())
    }

    /// Extend the context by one attribute; `_` and `__` select wildcards.
    pub fn select(&self, name: &str) -> Config {
        self.derive(self.context.clone().with(Segment::from_name(name)))
    }

    /// Extend the context by a single-segment wildcard.
    pub fn wildcard(&self) -> Config {
        self.derive(self.context.clone().with(Segment::wildcard()))
    }

    /// Extend the context by a wildcard spanning any number of segments.
    pub fn any_depth(&self) -> Config {
        self.derive(self.context.clone().with(Segment::double_wildcard()))
    }

    /// Index the last context segment.
    pub fn index(&self, i: i64) -> Result<Config> {
        self.index_with(Index::at(i))
    }

    /// Index the last context segment with a population length.
    pub fn index_bounded(&self, i: i64, length: usize) -> Result<Config> {
        self.index_with(Index::at(i).with_length(Some(length)))
    }

    pub fn index_with(&self, index: Index) -> Result<Config> {
        let context = self
            .context
            .index(index)
            .map_err(|_| ConfigError::NoContext { operation: "index" })?;
        Ok(self.derive(context))
    }

    /// Extend the context by a parsed path.
    pub fn with_selector(&self, path: impl IntoSelector) -> Result<Config> {
        Ok(self.derive(self.context.join(&path.into_selector()?)))
    }

    /// Register a rule at `path`, relative to the context.
    ///
    /// An empty path uses the context's last segment as the key.
    pub fn set(&mut self, path: impl IntoSelector, value: impl Into<RuleValue>) -> Result<&mut Self> {
        let path = path.into_selector()?;
        self.push_rule(path, value.into(), false)
    }

    /// Like [`Config::set`], but any normal rule on the same key wins.
    pub fn set_default(
        &mut self,
        path: impl IntoSelector,
        value: impl Into<RuleValue>,
    ) -> Result<&mut Self> {
        let path = path.into_selector()?;
        self.push_rule(path, value.into(), true)
    }

    fn push_rule(&mut self, path: Selector, value: RuleValue, default: bool) -> Result<&mut Self> {
        let full = self.context.join(&path);
        let (selector, head) = full.pop().ok_or(ConfigError::NoContext {
            operation: if default { "set a default" } else { "set" },
        })?;
        let rule = if default {
            Rule::new_default(selector, head, value)
        } else {
            Rule::new(selector, head, value)
        };
        debug!(rule = %rule, "registered rule");
        Arc::make_mut(&mut self.rules).push(Arc::new(rule));
        Ok(self)
    }

    /// Set the value at the current context and return to the root.
    pub fn assign(&self, value: impl Into<RuleValue>) -> Result<Config> {
        let mut out = self.clone();
        out.set(Selector::none(), value)?;
        Ok(out.root())
    }

    /// Set the value at the current context, merge `sub` under it, and
    /// return to the root.
    pub fn assign_with(&self, value: impl Into<RuleValue>, sub: &Config) -> Result<Config> {
        let mut out = self.clone();
        out.set(Selector::none(), value)?;
        out.merge(Selector::none(), sub)
    }

    /// Set several relative paths at once and return to the root.
    pub fn configure<I, K, V>(&self, entries: I) -> Result<Config>
    where
        I: IntoIterator<Item = (K, V)>,
        K: IntoSelector,
        V: Into<RuleValue>,
    {
        let mut out = self.clone();
        for (path, value) in entries {
            out.set(path, value)?;
        }
        Ok(out.root())
    }

    /// Append every rule of `source` under `context + path`.
    pub fn merge(&self, path: impl IntoSelector, source: &Config) -> Result<Config> {
        self.merge_with(path, source, MergeOptions::default())
    }

    pub fn merge_with(
        &self,
        path: impl IntoSelector,
        source: &Config,
        options: MergeOptions,
    ) -> Result<Config> {
        let prefix = self.context.join(&path.into_selector()?);
        let wrapped: Vec<Arc<Rule>> = source
            .rules
            .iter()
            .map(|rule| Arc::new(rule.wrap(&prefix, options.as_default)))
            .collect();
        debug!(
            prefix = %prefix,
            count = wrapped.len(),
            as_default = options.as_default,
            prepend = options.prepend,
            "merged rules"
        );

        let mut out = self.root();
        let rules = Arc::make_mut(&mut out.rules);
        if options.prepend {
            rules.splice(0..0, wrapped);
        } else {
            rules.extend(wrapped);
        }
        Ok(out)
    }

    /// Resolve `path` relative to the context to a single value.
    ///
    /// Fails with [`ConfigError::NoMatch`] if nothing matches and with
    /// [`ConfigError::AmbiguousMatch`] if several keys do.
    pub fn get(&self, path: impl IntoSelector) -> Result<Value> {
        let path = path.into_selector()?;
        let (full, mut values) = self.lookup(&path)?;
        match values.len() {
            0 => Err(self.no_match(&full)),
            1 => {
                let (key, resolution) = values.swap_remove_index(0).ok_or_else(|| self.no_match(&full))?;
                ready(key, resolution)
            }
            _ => Err(ConfigError::AmbiguousMatch {
                path: path.to_string(),
                keys: values.keys().cloned().collect(),
            }),
        }
    }

    /// Like [`Config::get`], returning `default` when nothing matches.
    pub fn get_or(&self, path: impl IntoSelector, default: impl Into<Value>) -> Result<Value> {
        match self.get(path) {
            Err(ConfigError::NoMatch { .. }) => Ok(default.into()),
            other => other,
        }
    }

    /// Resolve `path` to one value per matching key.
    pub fn get_all(&self, path: impl IntoSelector) -> Result<IndexMap<String, Value>> {
        let path = path.into_selector()?;
        let (full, values) = self.lookup(&path)?;
        if values.is_empty() {
            return Err(self.no_match(&full));
        }
        values
            .into_iter()
            .map(|(key, resolution)| {
                let value = ready(key.clone(), resolution)?;
                Ok((key, value))
            })
            .collect()
    }

    /// The value set at the current context itself.
    pub fn get_module(&self) -> Result<Value> {
        self.get(Selector::none())
    }

    /// Every parameter set directly under the context, materialized.
    ///
    /// Keys whose value waits on a hook that has not run are left out.
    pub fn get_parameters(&self) -> Result<IndexMap<String, Value>> {
        let raw = self.get_parameters_raw()?;
        self.initialize(raw)
    }

    /// Every parameter set directly under the context, as resolved.
    pub fn get_parameters_raw(&self) -> Result<IndexMap<String, Value>> {
        let rules = self.matching_rules(&Selector::none(), MatchMode::Selector)?;
        self.most_specific_per_key(&resolve::group_by_key(rules))
    }

    /// Register a named sub-configuration, replacing any existing one.
    pub fn add_ref(&mut self, name: impl Into<String>, config: Config) {
        let name = name.into();
        let refs = Arc::make_mut(&mut self.refs);
        if refs.contains_key(&name) {
            warn!(name = %name, "reference already exists and will be overwritten");
        }
        refs.insert(name, config);
    }

    pub fn get_ref(&self, name: &str) -> Option<&Config> {
        self.refs.get(name)
    }

    /// Bind `target` to a value captured on the first trigger run.
    ///
    /// The hook is stored at the current context under a hidden key and
    /// `target` (an absolute path) refers to it.
    pub fn on_first_forward(
        &self,
        target: impl IntoSelector,
        hook: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Result<Config> {
        self.register_hook(target.into_selector()?, ForwardHook::first_only(hook))
    }

    /// Like [`Config::on_first_forward`], but the hook runs on every trigger.
    pub fn on_forward(
        &self,
        target: impl IntoSelector,
        hook: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Result<Config> {
        self.register_hook(target.into_selector()?, ForwardHook::new(hook))
    }

    fn register_hook(&self, target: Selector, hook: ForwardHook) -> Result<Config> {
        let (body, head) = target.pop().ok_or(ConfigError::NoContext {
            operation: "register a forward hook",
        })?;
        let hidden = Segment::class(format!("___{}", head.key()));
        let reference = Ref::to(self.context.clone().with(hidden.clone()));

        let mut out = self.clone();
        let rules = Arc::make_mut(&mut out.rules);
        rules.push(Arc::new(Rule::new(body, head, RuleValue::Ref(reference))));
        rules.push(Arc::new(Rule::new(
            self.context.clone(),
            hidden,
            RuleValue::Hook(hook),
        )));
        Ok(out.root())
    }

    /// Hooks registered at the current context.
    pub fn forward_hooks(&self) -> Result<Vec<ForwardHook>> {
        let mut hooks: Vec<ForwardHook> = Vec::new();
        for mode in [MatchMode::Selector, MatchMode::Key] {
            for rule in self.matching_rules(&Selector::none(), mode)? {
                if let Some(hook) = rule.hook() {
                    if !hooks.iter().any(|h| h.ptr_eq(hook)) {
                        hooks.push(hook.clone());
                    }
                }
            }
        }
        Ok(hooks)
    }

    /// Run every hook registered at the current context on `x`.
    pub fn run_all_forward_hooks(&self, x: &Value) -> Result<()> {
        let hooks = self.forward_hooks()?;
        debug!(context = %self.context, count = hooks.len(), "running forward hooks");
        for hook in hooks {
            hook.call(x);
        }
        Ok(())
    }

    pub fn has_forward_hooks(&self) -> Result<bool> {
        Ok(!self.forward_hooks()?.is_empty())
    }

    fn no_match(&self, full: &Selector) -> ConfigError {
        ConfigError::NoMatch {
            path: full.to_string(),
            config: self.to_string(),
        }
    }
}

fn ready(key: String, resolution: Resolution) -> Result<Value> {
    match resolution {
        Resolution::Ready(value) => Ok(value),
        Resolution::Pending => Err(ConfigError::HookNotRun { key }),
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config(")?;
        for rule in self.rules.iter() {
            writeln!(f, "{}", rule)?;
        }
        write!(f, ")")
    }
}
