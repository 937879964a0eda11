//! Filter Lexer (spec.md §4.1): a token stream over filter source text.
//!
//! Keywords and operators are matched case-insensitively; everything that
//! isn't a recognized keyword, quoted string, or number is an attribute
//! name segment (`Token::Ident`), including URI-qualified segments like
//! `urn:ietf:params:scim:schemas:core:2.0:User:userName` (colons are a
//! valid identifier character so these lex as one token).

use crate::error::{FilterError, FilterResult};

/// A single filter token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBrack,
    RBrack,
    Dot,
    And,
    Or,
    Not,
    Pr,
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
    Eof,
}

/// A token paired with the byte offset it started at, for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Lex a full filter expression into a token stream, terminated by `Eof`.
pub fn tokenize(input: &str) -> FilterResult<Vec<Spanned>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                tokens.push(Spanned {
                    token: Token::LParen,
                    pos: start,
                });
                i += 1;
            }
            ')' => {
                tokens.push(Spanned {
                    token: Token::RParen,
                    pos: start,
                });
                i += 1;
            }
            '[' => {
                tokens.push(Spanned {
                    token: Token::LBrack,
                    pos: start,
                });
                i += 1;
            }
            ']' => {
                tokens.push(Spanned {
                    token: Token::RBrack,
                    pos: start,
                });
                i += 1;
            }
            '.' => {
                tokens.push(Spanned {
                    token: Token::Dot,
                    pos: start,
                });
                i += 1;
            }
            '"' => {
                let (text, consumed) = lex_string(&chars, i)?;
                tokens.push(Spanned {
                    token: Token::Str(text),
                    pos: start,
                });
                i = consumed;
            }
            c if c == '-' || c.is_ascii_digit() => {
                let (value, consumed) = lex_number(&chars, i)?;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    pos: start,
                });
                i = consumed;
            }
            c if is_ident_start(c) => {
                let (word, consumed) = lex_word(&chars, i);
                tokens.push(Spanned {
                    token: keyword_or_ident(&word),
                    pos: start,
                });
                i = consumed;
            }
            other => {
                return Err(FilterError::invalid_at(
                    format!("unexpected character '{other}'"),
                    start,
                ));
            }
        }
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: chars.len(),
    });
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':' || c == '$'
}

fn lex_word(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    while i < chars.len() && is_ident_start(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn keyword_or_ident(word: &str) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "pr" => Token::Pr,
        "eq" => Token::Eq,
        "ne" => Token::Ne,
        "co" => Token::Co,
        "sw" => Token::Sw,
        "ew" => Token::Ew,
        "gt" => Token::Gt,
        "ge" => Token::Ge,
        "lt" => Token::Lt,
        "le" => Token::Le,
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        _ => Token::Ident(word.to_string()),
    }
}

fn lex_string(chars: &[char], start: usize) -> FilterResult<(String, usize)> {
    let mut i = start + 1; // skip opening quote
    let mut out = String::new();
    loop {
        if i >= chars.len() {
            return Err(FilterError::invalid_at("unterminated string literal", start));
        }
        match chars[i] {
            '"' => {
                return Ok((out, i + 1));
            }
            '\\' => {
                i += 1;
                if i >= chars.len() {
                    return Err(FilterError::invalid_at("unterminated escape sequence", start));
                }
                match chars[i] {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'b' => out.push('\u{0008}'),
                    'f' => out.push('\u{000C}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        if i + 4 >= chars.len() {
                            return Err(FilterError::invalid_at("truncated unicode escape", start));
                        }
                        let hex: String = chars[i + 1..i + 5].iter().collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| FilterError::invalid_at("invalid unicode escape", start))?;
                        let ch = char::from_u32(code)
                            .ok_or_else(|| FilterError::invalid_at("invalid unicode escape", start))?;
                        out.push(ch);
                        i += 4;
                    }
                    other => {
                        return Err(FilterError::invalid_at(
                            format!("invalid escape sequence '\\{other}'"),
                            start,
                        ));
                    }
                }
                i += 1;
            }
            ch => {
                out.push(ch);
                i += 1;
            }
        }
    }
}

fn lex_number(chars: &[char], start: usize) -> FilterResult<(f64, usize)> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    let digits_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return Err(FilterError::invalid_at("malformed number literal", start));
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        let frac_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return Err(FilterError::invalid_at("malformed number literal", start));
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        i += 1;
        if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            i += 1;
        }
        let exp_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return Err(FilterError::invalid_at("malformed number literal", start));
        }
    }
    let text: String = chars[start..i].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| FilterError::invalid_at("malformed number literal", start))?;
    Ok((value, i))
}
