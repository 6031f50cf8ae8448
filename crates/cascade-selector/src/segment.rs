//! Path segments.

use std::fmt;

use crate::index::{Index, Positions};

/// The name part of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// An exact attribute name.
    Class(String),
    /// `_`: exactly one segment with any name.
    Wildcard,
    /// `__`: zero or more segments.
    DoubleWildcard,
}

/// One segment of a selector path: a name followed by zero or more indices.
///
/// `layers[0][1]` is the segment `layers` indexed twice; the last index is
/// the outermost one, and [`Segment::inner`] strips it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: Name,
    pub indices: Vec<Index>,
}

impl Segment {
    pub fn class(name: impl Into<String>) -> Self {
        Self::named(Name::Class(name.into()))
    }

    pub fn wildcard() -> Self {
        Self::named(Name::Wildcard)
    }

    pub fn double_wildcard() -> Self {
        Self::named(Name::DoubleWildcard)
    }

    /// Build a segment from an attribute name, mapping `_` and `__` to wildcards.
    pub fn from_name(name: &str) -> Self {
        match name {
            "_" => Self::wildcard(),
            "__" => Self::double_wildcard(),
            other => Self::class(other),
        }
    }

    fn named(name: Name) -> Self {
        Self {
            name,
            indices: Vec::new(),
        }
    }

    /// The key this segment contributes when used as a rule head.
    pub fn key(&self) -> &str {
        match &self.name {
            Name::Class(name) => name,
            Name::Wildcard => "_",
            Name::DoubleWildcard => "__",
        }
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// The outermost index, if any.
    pub fn last_index(&self) -> Option<&Index> {
        self.indices.last()
    }

    /// This segment with its outermost index removed.
    pub fn inner(&self) -> Segment {
        let mut inner = self.clone();
        inner.indices.pop();
        inner
    }

    /// This segment with every index removed.
    pub fn bare(&self) -> Segment {
        Self::named(self.name.clone())
    }

    /// This segment with `index` appended as the new outermost index.
    pub fn indexed(mut self, index: Index) -> Segment {
        self.indices.push(index);
        self
    }

    /// Anchorless pattern fragment for this segment, including the leading separator.
    pub(crate) fn pattern(&self) -> String {
        let mut pattern = match &self.name {
            Name::Class(name) => format!(r"\.{}", regex_lite::escape(name)),
            Name::Wildcard => r"\.[^.\[\]]+".to_string(),
            Name::DoubleWildcard => r"(?:\.[^.]+)*".to_string(),
        };
        for index in &self.indices {
            pattern.push_str(&index.pattern());
        }
        pattern
    }

    /// Flattened alternatives of this segment when it appears in a context.
    ///
    /// Every prefix of the index list is an alternative, so `layers[0][1]`
    /// yields `.layers[0][1]`, `.layers[0]` and `.layers`. Index selectors
    /// that address several positions expand to one form per position; open
    /// ranges contribute no indexed form.
    pub(crate) fn forms(&self) -> Vec<String> {
        let mut forms = vec![format!(".{}", self.key())];
        let mut frontier = forms.clone();
        for index in &self.indices {
            let positions = match index.positions() {
                Positions::Finite(positions) => positions,
                Positions::Open { .. } => break,
            };
            let next: Vec<String> = frontier
                .iter()
                .flat_map(|prefix| positions.iter().map(move |p| format!("{}[{}]", prefix, p)))
                .collect();
            if next.is_empty() {
                break;
            }
            forms.extend(next.iter().cloned());
            frontier = next;
        }
        forms
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())?;
        for index in &self.indices {
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_maps_wildcards() {
        assert_eq!(Segment::from_name("_").name, Name::Wildcard);
        assert_eq!(Segment::from_name("__").name, Name::DoubleWildcard);
        assert_eq!(Segment::from_name("conv").key(), "conv");
    }

    #[test]
    fn test_inner_strips_outermost_index() {
        let seg = Segment::class("layers")
            .indexed(Index::at(0))
            .indexed(Index::at(1));
        assert_eq!(seg.to_string(), "layers[0][1]");
        assert_eq!(seg.inner().to_string(), "layers[0]");
        assert_eq!(seg.inner().inner().to_string(), "layers");
        assert_eq!(seg.bare(), Segment::class("layers"));
        assert_eq!(seg.key(), "layers");
    }

    #[test]
    fn test_forms_include_every_index_prefix() {
        let seg = Segment::class("layers")
            .indexed(Index::at(0))
            .indexed(Index::at(1));
        assert_eq!(
            seg.forms(),
            vec![".layers", ".layers[0]", ".layers[0][1]"]
        );
    }

    #[test]
    fn test_forms_expand_multi_position_index() {
        let seg = Segment::class("x").indexed(Index::list([0, 2]));
        assert_eq!(seg.forms(), vec![".x", ".x[0]", ".x[2]"]);
    }

    #[test]
    fn test_class_pattern_is_escaped() {
        let seg = Segment::class("a+b");
        assert_eq!(seg.pattern(), r"\.a\+b");
    }
}
