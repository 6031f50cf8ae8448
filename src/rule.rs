//! Configuration rules
//!
//! A rule binds a selector path ("where"), a head segment ("what
//! attribute") and a value. Rules are immutable once registered; merging a
//! configuration into another wraps each rule under a new prefix instead of
//! editing it.

use std::fmt;
use std::sync::OnceLock;

use cascade_selector::{Selector, Segment};
use regex_lite::Regex;

use crate::error::Result;
use crate::hook::ForwardHook;
use crate::object::{ClassRef, Factory, Module};
use crate::reference::Ref;
use crate::value::Value;
use crate::Config;

/// Specificity of a rule set with `set`.
pub const SPECIFICITY_RULE: i32 = 1;
/// Specificity of a rule set with `set_default`.
pub const SPECIFICITY_DEFAULT: i32 = 0;
/// Specificity of the stand-in used when a key only has indexed rules.
pub(crate) const SPECIFICITY_PLACEHOLDER: i32 = -9999;

/// The value stored in a rule.
#[derive(Debug, Clone)]
pub enum RuleValue {
    Literal(Value),
    Ref(Ref),
    Hook(ForwardHook),
}

/// Outcome of resolving a single rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready(Value),
    /// Depends on a hook that has not run yet.
    Pending,
}

impl Resolution {
    pub fn ready(self) -> Option<Value> {
        match self {
            Resolution::Ready(v) => Some(v),
            Resolution::Pending => None,
        }
    }
}

/// Which path of a rule is matched against a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchMode {
    /// The selector alone.
    Selector = 0,
    /// Selector plus head.
    Key = 1,
    /// Selector plus head with its indices stripped.
    KeyIndexed = 2,
}

impl MatchMode {
    pub(crate) fn new(match_key: bool, allow_indexed: bool) -> Self {
        match (match_key, allow_indexed) {
            (false, _) => MatchMode::Selector,
            (true, false) => MatchMode::Key,
            (true, true) => MatchMode::KeyIndexed,
        }
    }
}

/// A single configuration rule.
pub struct Rule {
    selector: Selector,
    head: Segment,
    key: String,
    value: RuleValue,
    specificity: i32,
    default: bool,
    scope_root: Selector,
    patterns: [OnceLock<Regex>; 3],
}

impl Rule {
    pub fn new(selector: Selector, head: Segment, value: RuleValue) -> Self {
        Self::with_specificity(selector, head, value, SPECIFICITY_RULE, false)
    }

    /// A rule that loses to any normal rule on the same key.
    pub fn new_default(selector: Selector, head: Segment, value: RuleValue) -> Self {
        Self::with_specificity(selector, head, value, SPECIFICITY_DEFAULT, true)
    }

    pub(crate) fn placeholder() -> Self {
        Self::with_specificity(
            Selector::none(),
            Segment::class(""),
            RuleValue::Literal(Value::List(Vec::new())),
            SPECIFICITY_PLACEHOLDER,
            false,
        )
    }

    fn with_specificity(
        selector: Selector,
        head: Segment,
        value: RuleValue,
        specificity: i32,
        default: bool,
    ) -> Self {
        Self {
            key: head.key().to_string(),
            selector,
            head,
            value,
            specificity,
            default,
            scope_root: Selector::none(),
            patterns: Default::default(),
        }
    }

    /// Re-home this rule under `prefix`.
    ///
    /// Both the selector and the scope root are prefixed, so references keep
    /// resolving relative to where the rule was defined. `as_default` forces
    /// default specificity; otherwise specificity is inherited.
    pub fn wrap(&self, prefix: &Selector, as_default: bool) -> Rule {
        let (specificity, default) = if as_default {
            (SPECIFICITY_DEFAULT, true)
        } else {
            (self.specificity, self.default)
        };
        Rule {
            selector: prefix.join(&self.selector),
            head: self.head.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            specificity,
            default,
            scope_root: prefix.join(&self.scope_root),
            patterns: Default::default(),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn head(&self) -> &Segment {
        &self.head
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &RuleValue {
        &self.value
    }

    pub fn specificity(&self) -> i32 {
        self.specificity
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn scope_root(&self) -> &Selector {
        &self.scope_root
    }

    pub fn hook(&self) -> Option<&ForwardHook> {
        match &self.value {
            RuleValue::Hook(hook) => Some(hook),
            _ => None,
        }
    }

    /// Whether this rule should replace `other` as the current best candidate.
    ///
    /// Ties return `true`, so among equally specific rules the one
    /// registered last wins.
    pub fn is_more_specific_than(&self, other: Option<&Rule>) -> bool {
        match other {
            None => true,
            Some(other) if self.specificity != other.specificity => {
                self.specificity > other.specificity
            }
            Some(_) => true,
        }
    }

    /// Whether this rule applies to `context`.
    ///
    /// With `match_key` the head is part of the matched path; with
    /// `allow_indexed` an indexed head also matches its un-indexed key.
    pub fn matches(&self, context: &Selector, match_key: bool, allow_indexed: bool) -> Result<bool> {
        self.matches_forms(
            MatchMode::new(match_key, allow_indexed),
            context.is_none(),
            &context.forms(),
        )
    }

    pub(crate) fn matches_forms(
        &self,
        mode: MatchMode,
        context_is_none: bool,
        forms: &[String],
    ) -> Result<bool> {
        let path_is_none = mode == MatchMode::Selector && self.selector.is_none();
        match (path_is_none, context_is_none) {
            (true, true) => return Ok(true),
            (true, false) | (false, true) => return Ok(false),
            (false, false) => {}
        }
        let regex = self.pattern(mode)?;
        Ok(forms.iter().any(|form| regex.is_match(form)))
    }

    fn pattern(&self, mode: MatchMode) -> Result<&Regex> {
        let cell = &self.patterns[mode as usize];
        if let Some(regex) = cell.get() {
            return Ok(regex);
        }
        let path = match mode {
            MatchMode::Selector => self.selector.clone(),
            MatchMode::Key => self.selector.clone().with(self.head.clone()),
            MatchMode::KeyIndexed => self.selector.clone().with(self.head.bare()),
        };
        let regex = path.regex()?;
        Ok(cell.get_or_init(|| regex))
    }

    /// Resolve the stored value in the context of `config`.
    ///
    /// References are looked up from this rule's scope root and must match
    /// exactly one key. Hooks that have not run yet yield
    /// [`Resolution::Pending`].
    pub fn get_value(&self, config: &Config) -> Result<Resolution> {
        match &self.value {
            RuleValue::Literal(value) => Ok(Resolution::Ready(value.clone())),
            RuleValue::Hook(hook) => Ok(hook
                .try_value()
                .map_or(Resolution::Pending, Resolution::Ready)),
            RuleValue::Ref(reference) => {
                let scoped = config.rooted_at(self.scope_root.clone());
                Ok(match scoped.resolve_unique(reference.target())? {
                    Resolution::Ready(value) => Resolution::Ready(reference.apply(value)),
                    Resolution::Pending => Resolution::Pending,
                })
            }
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("selector", &self.selector.to_string())
            .field("head", &self.head.to_string())
            .field("value", &self.value)
            .field("specificity", &self.specificity)
            .field("scope_root", &self.scope_root.to_string())
            .finish()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.selector.is_none() {
            write!(f, "{}.", self.selector)?;
        }
        write!(f, "{} = {}", self.head, self.value)?;
        if self.default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Literal(v) => write!(f, "{}", v),
            RuleValue::Ref(r) => write!(f, "{}", r),
            RuleValue::Hook(h) => write!(f, "{}", h),
        }
    }
}

impl From<Value> for RuleValue {
    fn from(v: Value) -> Self {
        RuleValue::Literal(v)
    }
}

impl From<Ref> for RuleValue {
    fn from(r: Ref) -> Self {
        RuleValue::Ref(r)
    }
}

impl From<ForwardHook> for RuleValue {
    fn from(h: ForwardHook) -> Self {
        RuleValue::Hook(h)
    }
}

impl<T: Into<Value>> From<Vec<T>> for RuleValue {
    fn from(items: Vec<T>) -> Self {
        RuleValue::Literal(Value::from(items))
    }
}

macro_rules! literal_rule_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for RuleValue {
                fn from(v: $t) -> Self {
                    RuleValue::Literal(Value::from(v))
                }
            }
        )*
    };
}

literal_rule_value!(bool, i32, i64, usize, f64, &str, String, Module, Factory, ClassRef);

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_selector::parse_selector;

    fn rule(selector: &str, head: &str, value: i64) -> Rule {
        let (_, head) = parse_selector(head).unwrap().pop().unwrap();
        Rule::new(parse_selector(selector).unwrap(), head, RuleValue::from(value))
    }

    fn ctx(path: &str) -> Selector {
        parse_selector(path).unwrap()
    }

    #[test]
    fn test_specificity_ordering() {
        let normal = rule("a", "b", 1);
        let (_, head) = ctx("b").pop().unwrap();
        let default = Rule::new_default(ctx("a"), head, RuleValue::from(0));
        assert!(normal.is_more_specific_than(None));
        assert!(normal.is_more_specific_than(Some(&default)));
        assert!(!default.is_more_specific_than(Some(&normal)));
        // ties replace the current candidate
        assert!(normal.is_more_specific_than(Some(&rule("a", "b", 2))));
    }

    #[test]
    fn test_matches_selector_only() {
        let r = rule("a.b", "c", 1);
        assert!(r.matches(&ctx("a.b"), false, false).unwrap());
        assert!(!r.matches(&ctx("a.b.c"), false, false).unwrap());
    }

    #[test]
    fn test_matches_with_key() {
        let r = rule("a.b", "c", 1);
        assert!(r.matches(&ctx("a.b.c"), true, false).unwrap());
        assert!(!r.matches(&ctx("a.b"), true, false).unwrap());
    }

    #[test]
    fn test_root_rule_matches_root_context_only() {
        let r = rule("", "c", 1);
        assert!(r.matches(&Selector::none(), false, false).unwrap());
        assert!(!r.matches(&ctx("a"), false, false).unwrap());
        assert!(!r.matches(&Selector::none(), true, false).unwrap());
    }

    #[test]
    fn test_indexed_head_substitution() {
        let r = rule("", "layers[1]", 1);
        assert!(!r.matches(&ctx("layers"), true, false).unwrap());
        assert!(r.matches(&ctx("layers"), true, true).unwrap());
        assert!(r.matches(&ctx("layers[1]"), true, false).unwrap());
        assert_eq!(r.key(), "layers");
    }

    #[test]
    fn test_wrap_prefixes_selector_and_scope() {
        let r = rule("b", "c", 1);
        let wrapped = r.wrap(&ctx("outer"), false);
        assert_eq!(wrapped.selector(), &ctx("outer.b"));
        assert_eq!(wrapped.scope_root(), &ctx("outer"));
        assert_eq!(wrapped.specificity(), SPECIFICITY_RULE);

        let as_default = r.wrap(&ctx("outer"), true);
        assert_eq!(as_default.specificity(), SPECIFICITY_DEFAULT);
        assert!(as_default.is_default());
    }

    #[test]
    fn test_wrap_inherits_default_specificity() {
        let (_, head) = ctx("c").pop().unwrap();
        let default = Rule::new_default(Selector::none(), head, RuleValue::from(1));
        let wrapped = default.wrap(&ctx("x"), false);
        assert_eq!(wrapped.specificity(), SPECIFICITY_DEFAULT);
    }

    #[test]
    fn test_display() {
        let r = rule("a.b", "c", 10);
        assert_eq!(r.to_string(), "a.b.c = 10");
        let (_, head) = ctx("c").pop().unwrap();
        let d = Rule::new_default(Selector::none(), head, RuleValue::from("x"));
        assert_eq!(d.to_string(), "c = \"x\" (default)");
    }
}
