//! PATCH path parsing (RFC 7644 §3.5.2): a bare attribute path, optionally
//! carrying one bracket value-selector, e.g. `emails[type eq "work"].value`.
//!
//! PATCH paths reuse the filter grammar's path/selector production rather
//! than duplicating it: a PATCH path is exactly the `path_expr` production
//! with no trailing comparison or presence check.

use crate::error::{PatchError, PatchResult};
use crate::filter::ast::{AttrPath, PathSegment};
use crate::filter::lexer::{Token, tokenize};

/// Parse a PATCH `path` string into an [`AttrPath`].
///
/// An empty path (PATCH operations on the resource root) is represented as
/// an `AttrPath` with no segments.
pub fn parse_patch_path(input: &str) -> PatchResult<AttrPath> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(AttrPath { segments: vec![] });
    }

    let tokens =
        tokenize(trimmed).map_err(|e| PatchError::InvalidPath { message: e.to_string() })?;
    let mut pos = 0;
    let mut segments = Vec::new();
    let mut is_first_segment = true;

    loop {
        let name = expect_ident(&tokens, &mut pos)?;
        let name = strip_uri_prefix(&name);

        let selector = if matches!(tokens[pos].token, Token::LBrack) {
            if !is_first_segment {
                return Err(PatchError::InvalidPath {
                    message: "a value selector is only allowed on a path's first segment"
                        .to_string(),
                });
            }
            pos += 1;
            let predicate_tokens = take_until_rbrack(&tokens, &mut pos)?;
            let predicate = crate::filter::parser::parse_tokens(&predicate_tokens, 50)
                .map_err(|e| PatchError::InvalidPath { message: e.to_string() })?;
            Some(Box::new(predicate))
        } else {
            None
        };

        segments.push(PathSegment { name, selector });
        is_first_segment = false;

        match &tokens[pos].token {
            Token::Dot => {
                pos += 1;
            }
            Token::Eof => break,
            other => {
                return Err(PatchError::InvalidPath {
                    message: format!("unexpected token {other:?} in patch path"),
                });
            }
        }
    }

    Ok(AttrPath { segments })
}

fn expect_ident(tokens: &[crate::filter::lexer::Spanned], pos: &mut usize) -> PatchResult<String> {
    match &tokens[*pos].token {
        Token::Ident(name) => {
            let name = name.clone();
            *pos += 1;
            Ok(name)
        }
        other => Err(PatchError::InvalidPath {
            message: format!("expected attribute name, found {other:?}"),
        }),
    }
}

/// Collect the token span between a (just-consumed) `[` and its matching
/// `]`, honoring nested brackets, and append a synthetic `Eof` so the span
/// can be parsed as a standalone filter expression.
fn take_until_rbrack(
    tokens: &[crate::filter::lexer::Spanned],
    pos: &mut usize,
) -> PatchResult<Vec<crate::filter::lexer::Spanned>> {
    let mut depth = 1usize;
    let start = *pos;
    loop {
        match &tokens[*pos].token {
            Token::LBrack => depth += 1,
            Token::RBrack => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Token::Eof => {
                return Err(PatchError::InvalidPath {
                    message: "unterminated '[' in patch path".to_string(),
                });
            }
            _ => {}
        }
        *pos += 1;
    }
    let mut span: Vec<_> = tokens[start..*pos].to_vec();
    span.push(crate::filter::lexer::Spanned {
        token: Token::Eof,
        pos: tokens[*pos].pos,
    });
    *pos += 1; // consume ']'
    Ok(span)
}

fn strip_uri_prefix(segment: &str) -> String {
    match segment.rfind(':') {
        Some(idx) => segment[idx + 1..].to_string(),
        None => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_path_as_root() {
        let path = parse_patch_path("").unwrap();
        assert!(path.segments.is_empty());
    }

    #[test]
    fn parses_plain_dotted_path() {
        let path = parse_patch_path("name.givenName").unwrap();
        assert_eq!(path.display(), "name.givenName");
    }

    #[test]
    fn parses_path_with_value_selector() {
        let path = parse_patch_path(r#"emails[type eq "work"].value"#).unwrap();
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].name, "emails");
        assert!(path.segments[0].selector.is_some());
        assert_eq!(path.segments[1].name, "value");
    }

    #[test]
    fn rejects_unterminated_selector() {
        assert!(parse_patch_path(r#"emails[type eq "work""#).is_err());
    }

    #[test]
    fn rejects_selector_on_a_non_first_segment() {
        let result = parse_patch_path(r#"emails[type eq "work"].value[foo eq "x"]"#);
        assert!(matches!(result, Err(PatchError::InvalidPath { .. })));
    }
}
