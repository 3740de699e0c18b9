//! Dot/bracket property paths: `a.b[0].c`, `a["x.y"]`, `a['q']`.
//!
//! Parsing follows the usual JavaScript property-path conventions: dots
//! separate segments, brackets hold either an index or a quoted key, and a
//! leading dot or a doubled dot yields an empty segment.

use crate::error::{Error, Result};

/// Split `path` into its segments.
///
/// ```
/// use json_storage::path::parse;
///
/// assert_eq!(parse("a.b[0]['c.d']").unwrap(), vec!["a", "b", "0", "c.d"]);
/// ```
pub fn parse(path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    // Set after a `]` so that `a[0].b` doesn't emit an empty segment at the dot.
    let mut closed_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                } else if !closed_bracket {
                    segments.push(String::new());
                }
                closed_bracket = false;
                if chars.peek().is_none() {
                    segments.push(String::new());
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                segments.push(parse_bracket(path, &mut chars)?);
                closed_bracket = true;
            }
            _ => {
                closed_bracket = false;
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

fn parse_bracket(
    path: &str,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<String> {
    let mut segment = String::new();
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => segment.push(escaped),
                        None => break,
                    },
                    Some(c) if c == quote => break,
                    Some(c) => segment.push(c),
                    None => {
                        return Err(Error::InvalidPath(format!(
                            "unterminated quote in `{path}`"
                        )))
                    }
                }
            }
            match chars.next() {
                Some(']') => Ok(segment),
                _ => Err(Error::InvalidPath(format!(
                    "expected `]` after quoted key in `{path}`"
                ))),
            }
        }
        _ => {
            for c in chars.by_ref() {
                if c == ']' {
                    return Ok(segment);
                }
                segment.push(c);
            }
            Err(Error::InvalidPath(format!("unterminated `[` in `{path}`")))
        }
    }
}

/// Parse `segment` as an array index, if it looks like one.
pub fn as_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Join a parent locator and a child-relative path.
pub fn join(parent: Option<&str>, child: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{child}"),
        None => child.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dots() {
        assert_eq!(parse("a.b.c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(parse("single").unwrap(), vec!["single"]);
    }

    #[test]
    fn brackets_and_quotes() {
        assert_eq!(parse("a[0].b").unwrap(), vec!["a", "0", "b"]);
        assert_eq!(parse("a[\"x.y\"].z").unwrap(), vec!["a", "x.y", "z"]);
        assert_eq!(parse("a['it\\'s']").unwrap(), vec!["a", "it's"]);
        assert_eq!(parse("[1][2]").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn empty_segments() {
        assert_eq!(parse(".a").unwrap(), vec!["", "a"]);
        assert_eq!(parse("a..b").unwrap(), vec!["a", "", "b"]);
        assert_eq!(parse("a.").unwrap(), vec!["a", ""]);
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn unterminated_brackets_are_rejected() {
        assert!(matches!(parse("a[0"), Err(Error::InvalidPath(_))));
        assert!(matches!(parse("a['x]"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn index_detection() {
        assert_eq!(as_index("0"), Some(0));
        assert_eq!(as_index("12"), Some(12));
        assert_eq!(as_index("01"), None);
        assert_eq!(as_index("-1"), None);
        assert_eq!(as_index("x"), None);
    }

    #[test]
    fn join_locators() {
        assert_eq!(join(Some("a"), "b"), "a.b");
        assert_eq!(join(None, "b"), "b");
        assert_eq!(join(Some("a.b"), "c[0]"), "a.b.c[0]");
    }
}
