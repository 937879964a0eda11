//! Filter Parser (spec.md §4.2): recursive descent over the lexer's token
//! stream, tracking an AST complexity counter bounded by
//! `MAX_FILTER_COMPLEXITY`.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! filter  := or
//! or      := and ("or" and)*
//! and     := not ("and" not)*
//! not     := "not" primary | primary
//! primary := "(" filter ")" | path_expr
//! ```
//!
//! `path_expr` parses an attribute path, optionally carrying a bracket
//! selector on its first segment, and then one of a presence check, a
//! comparison, or (when a bracket selector was given and nothing follows
//! it) a standalone [`FilterNode::Complex`].

use super::ast::{AttrPath, CompareOp, FilterNode, Literal, PathSegment};
use super::lexer::{Token, tokenize};
use crate::error::{FilterError, FilterResult};

/// Maximum parenthesis/selector nesting depth, a defensive bound
/// independent of the complexity counter (grouping alone doesn't add
/// complexity, so deeply nested parens would otherwise be unbounded).
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    tokens: &'a [super::lexer::Spanned],
    pos: usize,
    complexity: usize,
    max_complexity: usize,
    depth: usize,
}

/// Parse a filter string into an AST, enforcing `max_complexity`.
pub fn parse(input: &str, max_complexity: usize) -> FilterResult<FilterNode> {
    let tokens = tokenize(input)?;
    let node = parse_tokens(&tokens, max_complexity)?;
    log::trace!("parsed filter {input:?} -> {node:?}");
    Ok(node)
}

/// Parse an already-lexed token stream (terminated by `Eof`) into an AST.
///
/// Used directly by the PATCH path parser, which lexes a full `path`
/// string itself and hands the bracketed span of a value-selector back to
/// this parser as a standalone token slice.
pub fn parse_tokens(
    tokens: &[super::lexer::Spanned],
    max_complexity: usize,
) -> FilterResult<FilterNode> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        complexity: 0,
        max_complexity,
        depth: 0,
    };
    let node = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(node)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_pos(&self) -> usize {
        self.tokens[self.pos].pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> FilterResult<()> {
        if matches!(self.peek(), Token::Eof) {
            Ok(())
        } else {
            Err(FilterError::invalid_at(
                format!("unexpected trailing token {:?}", self.peek()),
                self.peek_pos(),
            ))
        }
    }

    fn bump_complexity(&mut self) -> FilterResult<()> {
        self.complexity += 1;
        if self.complexity > self.max_complexity {
            return Err(FilterError::TooComplex {
                limit: self.max_complexity,
                found: self.complexity,
            });
        }
        Ok(())
    }

    fn enter(&mut self) -> FilterResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FilterError::invalid_at("filter nesting too deep", self.peek_pos()));
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> FilterResult<FilterNode> {
        self.enter()?;
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            self.bump_complexity()?;
            left = FilterNode::Or(Box::new(left), Box::new(right));
        }
        self.exit();
        Ok(left)
    }

    fn parse_and(&mut self) -> FilterResult<FilterNode> {
        self.enter()?;
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_not()?;
            self.bump_complexity()?;
            left = FilterNode::And(Box::new(left), Box::new(right));
        }
        self.exit();
        Ok(left)
    }

    fn parse_not(&mut self) -> FilterResult<FilterNode> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            let inner = self.parse_primary()?;
            self.bump_complexity()?;
            return Ok(FilterNode::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> FilterResult<FilterNode> {
        self.enter()?;
        let node = if matches!(self.peek(), Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            inner
        } else {
            self.parse_path_expr()?
        };
        self.exit();
        Ok(node)
    }

    fn expect(&mut self, expected: Token) -> FilterResult<Token> {
        if *self.peek() == expected {
            Ok(self.advance())
        } else {
            Err(FilterError::invalid_at(
                format!("expected {expected:?}, found {:?}", self.peek()),
                self.peek_pos(),
            ))
        }
    }

    fn parse_ident(&mut self) -> FilterResult<String> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(FilterError::invalid_at(
                format!("expected attribute name, found {other:?}"),
                self.peek_pos(),
            )),
        }
    }

    fn parse_path_expr(&mut self) -> FilterResult<FilterNode> {
        let first = self.parse_ident()?;
        let first_segment_name = strip_uri_prefix(&first);

        if matches!(self.peek(), Token::LBrack) {
            self.advance();
            let predicate = self.parse_or()?;
            self.expect(Token::RBrack)?;
            let sub = if matches!(self.peek(), Token::Dot) {
                self.advance();
                Some(self.parse_ident()?)
            } else {
                None
            };

            if is_operator_start(self.peek()) {
                let mut segments = vec![PathSegment {
                    name: first_segment_name,
                    selector: Some(Box::new(predicate)),
                }];
                if let Some(sub_name) = sub {
                    segments.push(PathSegment {
                        name: sub_name,
                        selector: None,
                    });
                }
                while matches!(self.peek(), Token::Dot) {
                    self.advance();
                    segments.push(PathSegment {
                        name: self.parse_ident()?,
                        selector: None,
                    });
                }
                return self.finish_path(AttrPath { segments });
            }

            self.bump_complexity()?;
            return Ok(FilterNode::Complex {
                path: AttrPath::simple([first_segment_name]),
                predicate: Box::new(predicate),
                sub,
            });
        }

        let mut segments = vec![PathSegment {
            name: first_segment_name,
            selector: None,
        }];
        while matches!(self.peek(), Token::Dot) {
            self.advance();
            segments.push(PathSegment {
                name: self.parse_ident()?,
                selector: None,
            });
        }
        self.finish_path(AttrPath { segments })
    }

    fn finish_path(&mut self, path: AttrPath) -> FilterResult<FilterNode> {
        match self.peek() {
            Token::Pr => {
                self.advance();
                self.bump_complexity()?;
                Ok(FilterNode::Present { path })
            }
            tok if is_operator_start(tok) => {
                let op = compare_op(&self.advance()).expect("checked by is_operator_start");
                let value = self.parse_literal()?;
                self.bump_complexity()?;
                Ok(FilterNode::Compare { path, op, value })
            }
            other => Err(FilterError::invalid_at(
                format!("expected 'pr' or a comparison operator, found {other:?}"),
                self.peek_pos(),
            )),
        }
    }

    fn parse_literal(&mut self) -> FilterResult<Literal> {
        match self.advance() {
            Token::Str(s) => Ok(Literal::Str(s)),
            Token::Number(n) => Ok(Literal::Num(n)),
            Token::True => Ok(Literal::Bool(true)),
            Token::False => Ok(Literal::Bool(false)),
            Token::Null => Ok(Literal::Null),
            other => Err(FilterError::invalid_at(
                format!("expected a literal value, found {other:?}"),
                self.peek_pos(),
            )),
        }
    }
}

fn is_operator_start(token: &Token) -> bool {
    compare_op(token).is_some()
}

fn compare_op(token: &Token) -> Option<CompareOp> {
    match token {
        Token::Eq => Some(CompareOp::Eq),
        Token::Ne => Some(CompareOp::Ne),
        Token::Co => Some(CompareOp::Co),
        Token::Sw => Some(CompareOp::Sw),
        Token::Ew => Some(CompareOp::Ew),
        Token::Gt => Some(CompareOp::Gt),
        Token::Ge => Some(CompareOp::Ge),
        Token::Lt => Some(CompareOp::Lt),
        Token::Le => Some(CompareOp::Le),
        _ => None,
    }
}

/// Strip a URI-qualified prefix (`urn:...:User:userName` -> `userName`),
/// per spec.md §4.3.
fn strip_uri_prefix(segment: &str) -> String {
    match segment.rfind(':') {
        Some(idx) => segment[idx + 1..].to_string(),
        None => segment.to_string(),
    }
}
