//! Selector path parser.
//!
//! Grammar:
//!
//! ```text
//! path    := "" | segment ("." segment)*
//! segment := name ("[" index "]")*
//! name    := [A-Za-z0-9_]+          ("_" and "__" are wildcards)
//! index   := int | int ("," int)+ | [int] ":" [int] [":" [int]]
//! ```

use crate::{Index, Segment, Selector, SelectorError};

/// Parse a selector path such as `encoder.blocks[0:2].__.conv`.
///
/// The empty string (or one made of whitespace) is the empty selector.
pub fn parse_selector(input: &str) -> Result<Selector, SelectorError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Selector::none());
    }

    let mut segments = Vec::new();
    let chars: Vec<char> = trimmed.chars().collect();
    let mut i = 0;

    loop {
        let start = i;
        while i < chars.len() && is_name_char(chars[i]) {
            i += 1;
        }
        if i == start {
            if i < chars.len() && chars[i] != '.' {
                return Err(SelectorError::UnexpectedChar {
                    input: trimmed.to_string(),
                    offset: i,
                    found: chars[i],
                });
            }
            return Err(SelectorError::EmptySegment {
                input: trimmed.to_string(),
                offset: i,
            });
        }
        let name: String = chars[start..i].iter().collect();
        let mut segment = Segment::from_name(&name);

        while i < chars.len() && chars[i] == '[' {
            let close = chars[i..]
                .iter()
                .position(|c| *c == ']')
                .map(|p| p + i)
                .ok_or_else(|| SelectorError::BadIndex(chars[i + 1..].iter().collect()))?;
            let body: String = chars[i + 1..close].iter().collect();
            segment = segment.indexed(parse_index(&body)?);
            i = close + 1;
        }

        if i == chars.len() {
            segments.push(segment);
            break;
        }
        if chars[i] != '.' {
            return Err(SelectorError::UnexpectedChar {
                input: trimmed.to_string(),
                offset: i,
                found: chars[i],
            });
        }
        segments.push(segment);
        i += 1;
    }

    Ok(Selector::from_segments(segments))
}

/// Parse the body of an index expression (without brackets).
pub fn parse_index(body: &str) -> Result<Index, SelectorError> {
    let body = body.trim();
    let bad = || SelectorError::BadIndex(body.to_string());

    if body.contains(':') {
        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() > 3 {
            return Err(bad());
        }
        let bound = |part: Option<&&str>| -> Result<Option<i64>, SelectorError> {
            match part.map(|p| p.trim()) {
                None | Some("") => Ok(None),
                Some(p) => p.parse().map(Some).map_err(|_| bad()),
            }
        };
        return Index::slice(bound(parts.first())?, bound(parts.get(1))?, bound(parts.get(2))?);
    }

    if body.contains(',') {
        let items = body
            .split(',')
            .map(|p| p.trim().parse::<i64>().map_err(|_| bad()))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Index::list(items));
    }

    body.parse::<i64>().map(Index::at).map_err(|_| bad())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
