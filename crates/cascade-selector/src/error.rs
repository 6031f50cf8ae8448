//! Selector error types.

/// Errors produced while parsing or transforming selectors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// A `.`-separated segment had no name (e.g. `a..b`).
    #[error("empty segment at offset {offset} in {input:?}")]
    EmptySegment { input: String, offset: usize },

    /// A character that is not valid at this position.
    #[error("unexpected character {found:?} at offset {offset} in {input:?}")]
    UnexpectedChar {
        input: String,
        offset: usize,
        found: char,
    },

    /// An index expression that could not be parsed.
    #[error("invalid index expression [{0}]")]
    BadIndex(String),

    /// A slice with a zero step.
    #[error("slice step cannot be zero")]
    ZeroStep,

    /// The operation needs at least one segment (e.g. indexing the empty selector).
    #[error("selector has no segment to {0}")]
    NoSegment(&'static str),

    /// The generated matching pattern was rejected by the regex engine.
    #[error("invalid matching pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}
