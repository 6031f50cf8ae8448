//! Populating repeated sub-structures
//!
//! `populate` registers one rule per position of an indexed context. The
//! values come from a [`Populator`]: a finite list, a lazy stream (consumed
//! only as far as needed) or a function of the position.

use std::fmt;
use std::sync::Arc;

use cascade_selector::{Index, IntoSelector, SelectorError, INDEX_LIMIT};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::rule::{Rule, RuleValue};
use crate::warn_once::UNKNOWN_GENERATOR_LENGTH;
use crate::Config;

type Generator = dyn Fn(usize) -> RuleValue + Send + Sync;

/// A source of per-position values.
pub enum Populator {
    /// Values in position order.
    Values(Vec<RuleValue>),
    /// Values in position order, of unknown length.
    Stream(Box<dyn Iterator<Item = RuleValue> + Send>),
    /// Called once per position with the position.
    Generate(Box<Generator>),
}

impl Populator {
    pub fn values<T: Into<RuleValue>>(items: impl IntoIterator<Item = T>) -> Self {
        Populator::Values(items.into_iter().map(Into::into).collect())
    }

    pub fn stream<T, I>(items: I) -> Self
    where
        T: Into<RuleValue> + 'static,
        I: Iterator<Item = T> + Send + 'static,
    {
        Populator::Stream(Box::new(items.map(Into::into)))
    }

    pub fn generate<T: Into<RuleValue>>(f: impl Fn(usize) -> T + Send + Sync + 'static) -> Self {
        Populator::Generate(Box::new(move |i| f(i).into()))
    }

    /// Number of values, when known up front.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            Populator::Values(values) => Some(values.len()),
            Populator::Stream(_) | Populator::Generate(_) => None,
        }
    }

    /// Pair positions with values; stops at the shorter of the two.
    fn take(self, positions: &[usize]) -> Vec<(usize, RuleValue)> {
        match self {
            Populator::Values(values) => positions.iter().copied().zip(values).collect(),
            Populator::Stream(stream) => positions.iter().copied().zip(stream).collect(),
            Populator::Generate(f) => positions.iter().map(|&p| (p, f(p))).collect(),
        }
    }
}

impl fmt::Debug for Populator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Populator::Values(values) => f.debug_tuple("Values").field(values).finish(),
            Populator::Stream(_) => f.write_str("Stream(..)"),
            Populator::Generate(_) => f.write_str("Generate(..)"),
        }
    }
}

impl Config {
    /// Register `path` for every position of the context's last segment.
    ///
    /// On an indexed context (`blocks[1:]`) the positions are those of the
    /// index, bounded by `length` when given. On a plain context the
    /// positions are `0..length`; without a length and without a sized
    /// populator they are capped at [`INDEX_LIMIT`] and a warning is emitted
    /// once per process.
    pub fn populate(
        &self,
        path: impl IntoSelector,
        populator: Populator,
        length: Option<usize>,
    ) -> Result<Config> {
        let (sub, key) = path
            .into_selector()?
            .pop()
            .ok_or(SelectorError::NoSegment("populate"))?;
        let (body, head) = self.context.pop().ok_or(ConfigError::NoContext {
            operation: "populate",
        })?;

        let (base, positions) = match head.last_index() {
            Some(index) => {
                let bounded = index.clone().with_length(length.or(index.length));
                (head.inner(), bounded.list_of_indices())
            }
            None => {
                if length.is_none() && populator.known_len().is_none() && UNKNOWN_GENERATOR_LENGTH.fire() {
                    warn!(
                        limit = INDEX_LIMIT,
                        "populating from a source of unknown length without an explicit length; \
                         only the first {} positions are populated",
                        INDEX_LIMIT
                    );
                }
                (head, (0..length.unwrap_or(INDEX_LIMIT)).collect())
            }
        };

        let mut out = self.root();
        let rules = Arc::make_mut(&mut out.rules);
        let mut count = 0;
        for (position, value) in populator.take(&positions) {
            let selector = body
                .clone()
                .with(base.clone().indexed(Index::at(position as i64)))
                .join(&sub);
            rules.push(Arc::new(Rule::new(selector, key.clone(), value)));
            count += 1;
        }
        debug!(context = %self.context, key = %key, count, "populated rules");
        Ok(out)
    }
}
