//! Index selectors
//!
//! An index selector addresses one or more positions of a repeated
//! sub-structure: a single position (`[2]`), a slice (`[1:4]`, `[::2]`)
//! or an explicit list (`[0,3]`). An optional length bounds the selector
//! so that negative positions and open-ended slices become enumerable.

use std::fmt;

use crate::SelectorError;

/// Upper bound used whenever an open-ended index has to be enumerated.
pub const INDEX_LIMIT: usize = 256;

/// The raw index expression, as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexSpec {
    /// A single position; negative values count from the end.
    At(i64),
    /// A python-style slice.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// An explicit list of positions.
    List(Vec<i64>),
}

/// An index expression with an optional population length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    pub spec: IndexSpec,
    pub length: Option<usize>,
}

/// Concrete positions addressed by an [`Index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Positions {
    /// A known, finite set of positions in selector order.
    Finite(Vec<usize>),
    /// Every `step`-th position from `start` onwards, with no upper bound.
    Open { start: usize, step: usize },
}

impl Positions {
    /// Whether position `i` is addressed.
    pub fn contains(&self, i: usize) -> bool {
        match self {
            Positions::Finite(positions) => positions.contains(&i),
            Positions::Open { start, step } => i >= *start && (i - start) % step == 0,
        }
    }

    /// Enumerate the positions, truncating open ranges at `limit`.
    pub fn to_vec(&self, limit: usize) -> Vec<usize> {
        match self {
            Positions::Finite(positions) => positions.clone(),
            Positions::Open { start, step } => (*start..limit).step_by(*step).collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Positions::Open { .. })
    }
}

impl Index {
    /// A single position.
    pub fn at(i: i64) -> Self {
        Self {
            spec: IndexSpec::At(i),
            length: None,
        }
    }

    /// An explicit list of positions.
    pub fn list(positions: impl IntoIterator<Item = i64>) -> Self {
        Self {
            spec: IndexSpec::List(positions.into_iter().collect()),
            length: None,
        }
    }

    /// A slice. Fails if `step` is zero.
    pub fn slice(
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    ) -> Result<Self, SelectorError> {
        if step == Some(0) {
            return Err(SelectorError::ZeroStep);
        }
        Ok(Self {
            spec: IndexSpec::Slice { start, stop, step },
            length: None,
        })
    }

    /// The same index expression bounded by `length`.
    pub fn with_length(mut self, length: Option<usize>) -> Self {
        self.length = length;
        self
    }

    /// Resolve the expression to concrete positions.
    ///
    /// Without a length, negative positions cannot be resolved and are
    /// dropped, a slice without a stop is [`Positions::Open`] and a slice
    /// stop is capped at [`INDEX_LIMIT`].
    pub fn positions(&self) -> Positions {
        match &self.spec {
            IndexSpec::At(i) => Positions::Finite(self.normalize(*i).into_iter().collect()),
            IndexSpec::List(items) => {
                let mut positions = Vec::with_capacity(items.len());
                for i in items {
                    if let Some(p) = self.normalize(*i) {
                        if !positions.contains(&p) {
                            positions.push(p);
                        }
                    }
                }
                Positions::Finite(positions)
            }
            IndexSpec::Slice { start, stop, step } => {
                let step = step.unwrap_or(1);
                match self.length {
                    Some(len) => Positions::Finite(slice_positions(*start, *stop, step, len)),
                    None => unbounded_slice(*start, *stop, step),
                }
            }
        }
    }

    /// Enumerate positions, bounding open ranges at [`INDEX_LIMIT`].
    pub fn list_of_indices(&self) -> Vec<usize> {
        self.positions().to_vec(INDEX_LIMIT)
    }

    fn normalize(&self, i: i64) -> Option<usize> {
        if i >= 0 {
            let i = i as usize;
            match self.length {
                Some(len) if i >= len => None,
                _ => Some(i),
            }
        } else {
            let len = self.length? as i64;
            let i = len + i;
            (i >= 0).then_some(i as usize)
        }
    }

    /// Pattern fragment matching any addressed position in a flattened path.
    pub(crate) fn pattern(&self) -> String {
        let positions = self.list_of_indices();
        if positions.is_empty() {
            // Flattened contexts never contain `[]`, so this never matches.
            return r"\[\]".to_string();
        }
        let alternatives: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
        format!(r"\[(?:{})\]", alternatives.join("|"))
    }
}

fn unbounded_slice(start: Option<i64>, stop: Option<i64>, step: i64) -> Positions {
    let start = start.unwrap_or(0);
    if step < 0 || start < 0 {
        return Positions::Finite(Vec::new());
    }
    match stop {
        None => Positions::Open {
            start: start as usize,
            step: step as usize,
        },
        Some(stop) if stop >= 0 => Positions::Finite(
            (start..stop.min(INDEX_LIMIT as i64))
                .step_by(step as usize)
                .map(|i| i as usize)
                .collect(),
        ),
        Some(_) => Positions::Finite(Vec::new()),
    }
}

fn slice_positions(start: Option<i64>, stop: Option<i64>, step: i64, len: usize) -> Vec<usize> {
    let len = len as i64;
    let clamp = |v: i64, lo: i64, hi: i64| v.max(lo).min(hi);
    let wrap = |v: i64| if v < 0 { v + len } else { v };

    let mut positions = Vec::new();
    if step > 0 {
        let mut i = start.map_or(0, |s| clamp(wrap(s), 0, len));
        let stop = stop.map_or(len, |s| clamp(wrap(s), 0, len));
        while i < stop {
            positions.push(i as usize);
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    } else {
        let mut i = start.map_or(len - 1, |s| clamp(wrap(s), -1, len - 1));
        let stop = stop.map_or(-1, |s| clamp(wrap(s), -1, len - 1));
        while i > stop {
            positions.push(i as usize);
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    }
    positions
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
        match &self.spec {
            IndexSpec::At(i) => write!(f, "[{}]", i),
            IndexSpec::List(items) => {
                let items: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", items.join(","))
            }
            IndexSpec::Slice { start, stop, step } => match step {
                Some(_) => write!(f, "[{}:{}:{}]", opt(start), opt(stop), opt(step)),
                None => write!(f, "[{}:{}]", opt(start), opt(stop)),
            },
        }
    }
}
