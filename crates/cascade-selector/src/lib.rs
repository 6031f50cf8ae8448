//! Selector paths for cascade rule resolution.
//!
//! A [`Selector`] is an ordered sequence of [`Segment`]s. It is used both to
//! address a location in a configuration tree (`encoder.blocks[0].conv`) and
//! as a pattern that is matched against a concrete context path, with `_`
//! matching one segment and `__` matching any number of segments.
//!
//! Matching works on flattened strings: a context expands to all of its
//! flattened forms (see [`Selector::forms`]) and a pattern compiles to an
//! anchored regular expression (see [`Selector::regex`]).

mod error;
mod index;
mod parser;
mod segment;

pub use error::SelectorError;
pub use index::{Index, IndexSpec, Positions, INDEX_LIMIT};
pub use parser::{parse_index, parse_selector};
pub use segment::{Name, Segment};

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use regex_lite::Regex;

/// An ordered path of segments. The empty selector is the "none" selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selector {
    segments: Vec<Segment>,
}

impl Selector {
    /// The empty selector (the root).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// A single exact-name segment.
    pub fn class(name: impl Into<String>) -> Self {
        Self::from_segments(vec![Segment::class(name)])
    }

    pub fn is_none(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_none()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Concatenate two selectors.
    pub fn join(&self, other: &Selector) -> Selector {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Selector { segments }
    }

    /// This selector with one more segment appended.
    pub fn with(mut self, segment: Segment) -> Selector {
        self.segments.push(segment);
        self
    }

    /// Split into everything but the last segment, and the last segment.
    ///
    /// Returns `None` for the empty selector.
    pub fn pop(&self) -> Option<(Selector, Segment)> {
        let (last, body) = self.segments.split_last()?;
        Some((Selector::from_segments(body.to_vec()), last.clone()))
    }

    /// Key of the last segment.
    pub fn key(&self) -> Option<&str> {
        self.last().map(Segment::key)
    }

    /// Index the last segment. Fails on the empty selector.
    pub fn index(&self, index: Index) -> Result<Selector, SelectorError> {
        let (body, head) = self.pop().ok_or(SelectorError::NoSegment("index"))?;
        Ok(body.with(head.indexed(index)))
    }

    /// Index the last segment at a single position.
    pub fn at(&self, position: usize) -> Result<Selector, SelectorError> {
        self.index(Index::at(position as i64))
    }

    /// The anchored pattern this selector matches flattened contexts with.
    pub fn pattern(&self) -> String {
        let body: String = self.segments.iter().map(Segment::pattern).collect();
        format!("^{}$", body)
    }

    /// Compile [`Selector::pattern`].
    pub fn regex(&self) -> Result<Regex, SelectorError> {
        let pattern = self.pattern();
        Regex::new(&pattern).map_err(|e| SelectorError::Pattern {
            message: e.to_string(),
            pattern,
        })
    }

    /// All flattened forms of this selector used as a context.
    ///
    /// The cartesian product of every segment's alternatives; see
    /// [`Segment`] for how indexed segments expand.
    pub fn forms(&self) -> Vec<String> {
        let mut forms = vec![String::new()];
        for segment in &self.segments {
            let alternatives = segment.forms();
            forms = forms
                .iter()
                .flat_map(|prefix| alternatives.iter().map(move |alt| format!("{}{}", prefix, alt)))
                .collect();
        }
        forms
    }

    /// Whether this pattern matches any flattened form of `context`.
    ///
    /// Two empty selectors match each other; an empty selector never
    /// matches a non-empty one.
    pub fn matches(&self, context: &Selector) -> Result<bool, SelectorError> {
        match (self.is_none(), context.is_none()) {
            (true, true) => return Ok(true),
            (true, false) | (false, true) => return Ok(false),
            (false, false) => {}
        }
        let regex = self.regex()?;
        Ok(context.forms().iter().any(|form| regex.is_match(form)))
    }
}

impl Add<&Selector> for &Selector {
    type Output = Selector;

    fn add(self, rhs: &Selector) -> Selector {
        self.join(rhs)
    }
}

impl Add for Selector {
    type Output = Selector;

    fn add(mut self, rhs: Selector) -> Selector {
        self.segments.extend(rhs.segments);
        self
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selector(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<Segment> for Selector {
    fn from(segment: Segment) -> Self {
        Selector::from_segments(vec![segment])
    }
}

/// Anything that can be turned into a selector: path strings are parsed,
/// selectors pass through.
pub trait IntoSelector {
    fn into_selector(self) -> Result<Selector, SelectorError>;
}

impl IntoSelector for &str {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        parse_selector(self)
    }
}

impl IntoSelector for String {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        parse_selector(&self)
    }
}

impl IntoSelector for &String {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        parse_selector(self)
    }
}

impl IntoSelector for Selector {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(self)
    }
}

impl IntoSelector for &Selector {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(self.clone())
    }
}

impl IntoSelector for Segment {
    fn into_selector(self) -> Result<Selector, SelectorError> {
        Ok(Selector::from(self))
    }
}
