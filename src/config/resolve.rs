//! Specificity resolution
//!
//! Resolution runs in three steps: collect the rules matching a context,
//! group them by key, then reduce each group to a value. Plain reduction
//! picks the most specific rule per key. Indexed reduction additionally
//! assembles a per-position list when some rules of the key address
//! positions (`layers[0]`, `layers[1:3]`) and others address the key as a
//! whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use cascade_selector::{Positions, Selector, Segment};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{ConfigError, Result};
use crate::rule::{MatchMode, Resolution, Rule};
use crate::value::Value;
use crate::Config;

impl Config {
    /// Rules whose path matches `context + path`, in registration order.
    pub(crate) fn matching_rules(&self, path: &Selector, mode: MatchMode) -> Result<Vec<Arc<Rule>>> {
        let context = self.context.join(path);
        let forms = context.forms();
        let mut matched = Vec::new();
        for rule in self.rules.iter() {
            if rule.matches_forms(mode, context.is_none(), &forms)? {
                matched.push(Arc::clone(rule));
            }
        }
        trace!(context = %context, ?mode, matched = matched.len(), "matched rules");
        Ok(matched)
    }

    /// Resolve `path` to one resolution per matching key.
    ///
    /// Returns the full path looked up alongside the values.
    pub(crate) fn lookup(&self, path: &Selector) -> Result<(Selector, IndexMap<String, Resolution>)> {
        let full = self.context.join(path);
        let final_is_index = full.last().map_or(false, Segment::is_indexed);
        let mode = if final_is_index {
            MatchMode::Key
        } else {
            MatchMode::KeyIndexed
        };
        let groups = group_by_key(self.matching_rules(path, mode)?);

        let values = if final_is_index {
            self.resolve_per_key(&groups)?
        } else {
            self.most_specific_per_key_and_index(&groups)?
        };
        Ok((full, values))
    }

    /// Resolve a reference target, which must match exactly one key.
    pub(crate) fn resolve_unique(&self, target: &Selector) -> Result<Resolution> {
        let (full, values) = self.lookup(target)?;
        if values.len() > 1 {
            return Err(ConfigError::AmbiguousMatch {
                path: target.to_string(),
                keys: values.keys().cloned().collect(),
            });
        }
        values
            .into_iter()
            .next()
            .map(|(_, resolution)| resolution)
            .ok_or_else(|| ConfigError::NoMatch {
                path: full.to_string(),
                config: self.to_string(),
            })
    }

    /// The most specific rule's resolution for each key.
    pub(crate) fn resolve_per_key(
        &self,
        groups: &IndexMap<String, Vec<Arc<Rule>>>,
    ) -> Result<IndexMap<String, Resolution>> {
        let mut values = IndexMap::with_capacity(groups.len());
        for (key, rules) in groups {
            if let Some(rule) = take_most_specific(rules.iter().map(Arc::as_ref)) {
                values.insert(key.clone(), rule.get_value(self)?);
            }
        }
        Ok(values)
    }

    /// The most specific rule's value for each key.
    ///
    /// Keys whose value is pending on an unrun hook are skipped; any other
    /// failure propagates.
    pub(crate) fn most_specific_per_key(
        &self,
        groups: &IndexMap<String, Vec<Arc<Rule>>>,
    ) -> Result<IndexMap<String, Value>> {
        let mut values = IndexMap::with_capacity(groups.len());
        for (key, resolution) in self.resolve_per_key(groups)? {
            match resolution {
                Resolution::Ready(value) => {
                    values.insert(key, value);
                }
                Resolution::Pending => debug!(key = %key, "skipping key pending on a forward hook"),
            }
        }
        Ok(values)
    }

    /// Per-key reduction that merges indexed and whole-key rules.
    pub(crate) fn most_specific_per_key_and_index(
        &self,
        groups: &IndexMap<String, Vec<Arc<Rule>>>,
    ) -> Result<IndexMap<String, Resolution>> {
        let mut values = IndexMap::with_capacity(groups.len());
        for (key, rules) in groups {
            let (indexed, plain): (Vec<&Rule>, Vec<&Rule>) = rules
                .iter()
                .map(Arc::as_ref)
                .partition(|rule| rule.head().is_indexed());

            let placeholder;
            let base_rule = match take_most_specific(plain.iter().copied()) {
                Some(rule) => rule,
                None => {
                    placeholder = Rule::placeholder();
                    &placeholder
                }
            };
            let base = base_rule.get_value(self)?;
            if indexed.is_empty() {
                values.insert(key.clone(), base);
                continue;
            }

            let broadcast = match base {
                Resolution::Ready(Value::List(items)) => items,
                Resolution::Ready(other) => vec![other],
                Resolution::Pending => {
                    values.insert(key.clone(), Resolution::Pending);
                    continue;
                }
            };

            let sources = assign_positions(&indexed, broadcast.len(), base_rule.specificity());
            check_contiguous(key, &sources)?;

            let mut items = Vec::with_capacity(sources.len());
            let mut pending = false;
            for (position, source) in &sources {
                match source {
                    Source::Broadcast => items.push(broadcast[*position].clone()),
                    Source::Rule(rule) => match rule.get_value(self)? {
                        Resolution::Ready(value) => items.push(value),
                        Resolution::Pending => pending = true,
                    },
                }
            }
            let resolution = if pending {
                Resolution::Pending
            } else {
                Resolution::Ready(Value::List(items))
            };
            values.insert(key.clone(), resolution);
        }
        Ok(values)
    }
}

/// Group rules by key, keeping first-seen key order and registration order.
pub(crate) fn group_by_key(rules: Vec<Arc<Rule>>) -> IndexMap<String, Vec<Arc<Rule>>> {
    let mut groups: IndexMap<String, Vec<Arc<Rule>>> = IndexMap::new();
    for rule in rules {
        groups.entry(rule.key().to_string()).or_default().push(rule);
    }
    groups
}

/// The most specific rule; the last one wins among equals.
pub(crate) fn take_most_specific<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> Option<&'a Rule> {
    let mut best: Option<&Rule> = None;
    for rule in rules {
        if rule.is_more_specific_than(best) {
            best = Some(rule);
        }
    }
    best
}

/// Where the value at one position comes from.
#[derive(Debug, Clone, Copy)]
enum Source<'a> {
    /// The whole-key winner's value, read at the position.
    Broadcast,
    Rule(&'a Rule),
}

/// Choose a source for every known position.
///
/// Known positions are those addressed by bounded indexed rules plus the
/// broadcast range. Open-ended indexed rules only compete for known
/// positions. The broadcast keeps a position unless an indexed rule there
/// is at least as specific as the whole-key winner.
fn assign_positions<'a>(
    indexed: &[&'a Rule],
    broadcast_len: usize,
    base_specificity: i32,
) -> BTreeMap<usize, Source<'a>> {
    let positions: Vec<Positions> = indexed
        .iter()
        .map(|rule| {
            rule.head()
                .last_index()
                .map_or(Positions::Finite(Vec::new()), |index| index.positions())
        })
        .collect();

    let mut slots: BTreeMap<usize, Vec<&'a Rule>> = (0..broadcast_len).map(|p| (p, Vec::new())).collect();
    for addressed in &positions {
        if let Positions::Finite(list) = addressed {
            for &p in list {
                slots.entry(p).or_default();
            }
        }
    }
    for (rule, addressed) in indexed.iter().zip(&positions) {
        for (p, slot) in slots.iter_mut() {
            if addressed.contains(*p) {
                slot.push(*rule);
            }
        }
    }

    slots
        .into_iter()
        .filter_map(|(p, slot)| {
            let strongest = slot.iter().map(|rule| rule.specificity()).max();
            let broadcast_wins =
                p < broadcast_len && strongest.map_or(true, |s| base_specificity > s);
            if broadcast_wins {
                Some((p, Source::Broadcast))
            } else {
                take_most_specific(slot).map(|rule| (p, Source::Rule(rule)))
            }
        })
        .collect()
}

fn check_contiguous(key: &str, sources: &BTreeMap<usize, Source<'_>>) -> Result<()> {
    let Some(&last) = sources.keys().next_back() else {
        return Ok(());
    };
    let missing: Vec<usize> = (0..last).filter(|p| !sources.contains_key(p)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::GapInIndices {
            key: key.to_string(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleValue;
    use cascade_selector::{parse_selector, Index};

    fn indexed_rule(index: Index, value: i64) -> Rule {
        Rule::new(
            Selector::none(),
            Segment::class("x").indexed(index),
            RuleValue::from(value),
        )
    }

    #[test]
    fn test_take_most_specific_prefers_last_among_equals() {
        let first = indexed_rule(Index::at(0), 1);
        let second = indexed_rule(Index::at(0), 2);
        let best = take_most_specific([&first, &second]).unwrap();
        assert!(std::ptr::eq(best, &second));
        assert!(take_most_specific(std::iter::empty()).is_none());
    }

    #[test]
    fn test_group_by_key_keeps_order() {
        let rules = vec![
            Arc::new(Rule::new(Selector::none(), Segment::class("b"), RuleValue::from(1))),
            Arc::new(Rule::new(Selector::none(), Segment::class("a"), RuleValue::from(2))),
            Arc::new(Rule::new(Selector::none(), Segment::class("b"), RuleValue::from(3))),
        ];
        let groups = group_by_key(rules);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(groups["b"].len(), 2);
    }

    #[test]
    fn test_open_rules_only_fill_known_positions() {
        let bounded = indexed_rule(Index::at(3), 1);
        let open = indexed_rule(Index::slice(Some(1), None, None).unwrap(), 2);
        let sources = assign_positions(&[&bounded, &open], 2, 1);
        assert_eq!(sources.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
        assert!(matches!(sources[&0], Source::Broadcast));
        assert!(matches!(sources[&1], Source::Rule(r) if std::ptr::eq(r, &open)));
        assert!(matches!(sources[&3], Source::Rule(r) if std::ptr::eq(r, &open)));
    }

    #[test]
    fn test_gap_is_reported() {
        let a = indexed_rule(Index::at(0), 1);
        let b = indexed_rule(Index::at(2), 1);
        let sources = assign_positions(&[&a, &b], 0, -9999);
        assert!(matches!(
            check_contiguous("x", &sources),
            Err(ConfigError::GapInIndices { missing, .. }) if missing == vec![1]
        ));
    }

    #[test]
    fn test_lookup_final_index_matches_heads_exactly() {
        let mut config = Config::new();
        config.set("x[0]", 1).unwrap();
        config.set("x[1]", 2).unwrap();
        let (full, values) = config.lookup(&parse_selector("x[1]").unwrap()).unwrap();
        assert_eq!(full.to_string(), "x[1]");
        assert_eq!(values["x"], Resolution::Ready(Value::Int(2)));
    }
}
