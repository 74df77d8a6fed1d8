// SPDX-License-Identifier: MIT

//! Tokenizer for text condition expressions
//!
//! String literals are located up front by [`scan_literals`] and consumed as
//! whole spans, so nothing between the quotes is ever read as an operator or a
//! field name.

use super::literal::{scan_literals, LiteralSpan};
use crate::error::CompileError;

/// Lexer token produced from expression text
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Ident(&'a str),
    Number(f64),
    Str(String),
    /// `in` keyword
    In,
    AndAnd,
    OrOr,
    Bang,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Lte,
    Gt,
    Gte,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

/// Token paired with its byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'a> {
    pub token: Token<'a>,
    pub position: usize,
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", other.symbol()),
        }
    }
}

impl Token<'_> {
    fn symbol(&self) -> &'static str {
        match self {
            Token::In => "in",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::EqEq => "==",
            Token::EqEqEq => "===",
            Token::NotEq => "!=",
            Token::NotEqEq => "!==",
            Token::Lt => "<",
            Token::Lte => "<=",
            Token::Gt => ">",
            Token::Gte => ">=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Ident(_) | Token::Number(_) | Token::Str(_) | Token::Eof => "",
        }
    }
}

/// Tokenize an expression
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken<'_>>, CompileError> {
    Lexer::new(input).lex()
}

struct Lexer<'a> {
    input: &'a str,
    literals: Vec<LiteralSpan>,
    offset: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            literals: scan_literals(input),
            offset: 0,
        }
    }

    fn lex(mut self) -> Result<Vec<SpannedToken<'a>>, CompileError> {
        let mut tokens = Vec::new();
        let input = self.input;
        let bytes = input.as_bytes();

        while self.offset < bytes.len() {
            let start = self.offset;
            let ch = bytes[start];
            let token = match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                    continue;
                }
                b'"' | b'\'' | b'`' => self.string(start)?,
                b'0'..=b'9' => self.number(start)?,
                b'.' if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) => {
                    self.number(start)?
                }
                b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => {
                    self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$');
                    match &self.input[start..self.offset] {
                        "in" => Token::In,
                        ident => Token::Ident(ident),
                    }
                }
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b'[' => self.single(Token::LBracket),
                b']' => self.single(Token::RBracket),
                b',' => self.single(Token::Comma),
                b'~' => self.single(Token::Tilde),
                b'+' => self.single(Token::Plus),
                b'-' => self.single(Token::Minus),
                b'*' => self.single(Token::Star),
                b'/' => self.single(Token::Slash),
                b'%' => self.single(Token::Percent),
                b'&' if self.peek(1) == Some(b'&') => self.advance(2, Token::AndAnd),
                b'|' if self.peek(1) == Some(b'|') => self.advance(2, Token::OrOr),
                b'=' if self.peek(1) == Some(b'=') => {
                    if self.peek(2) == Some(b'=') {
                        self.advance(3, Token::EqEqEq)
                    } else {
                        self.advance(2, Token::EqEq)
                    }
                }
                b'!' => {
                    if self.peek(1) == Some(b'=') {
                        if self.peek(2) == Some(b'=') {
                            self.advance(3, Token::NotEqEq)
                        } else {
                            self.advance(2, Token::NotEq)
                        }
                    } else {
                        self.single(Token::Bang)
                    }
                }
                b'<' if self.peek(1) == Some(b'=') => self.advance(2, Token::Lte),
                b'<' => self.single(Token::Lt),
                b'>' if self.peek(1) == Some(b'=') => self.advance(2, Token::Gte),
                b'>' => self.single(Token::Gt),
                _ => {
                    let found = self.input[start..].chars().next().unwrap_or('\u{fffd}');
                    return Err(CompileError::UnexpectedChar {
                        found,
                        position: start,
                    });
                }
            };
            tokens.push(SpannedToken {
                token,
                position: start,
            });
        }

        if tokens.is_empty() {
            return Err(CompileError::EmptyInput);
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.input.as_bytes().get(self.offset + ahead).copied()
    }

    fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.advance(1, token)
    }

    fn advance(&mut self, len: usize, token: Token<'a>) -> Token<'a> {
        self.offset += len;
        token
    }

    fn consume_while<F>(&mut self, condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = self.input.as_bytes().get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    fn string(&mut self, start: usize) -> Result<Token<'a>, CompileError> {
        let span = self
            .literals
            .iter()
            .find(|s| s.start == start)
            .copied()
            .ok_or(CompileError::UnterminatedString { position: start })?;
        self.offset = span.after();
        Ok(Token::Str(unescape(span.content(self.input))))
    }

    fn number(&mut self, start: usize) -> Result<Token<'a>, CompileError> {
        self.consume_while(|b| b.is_ascii_digit());
        if self.peek(0) == Some(b'.') {
            self.offset += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        let raw = &self.input[start..self.offset];
        raw.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| CompileError::InvalidNumber {
                raw: raw.to_string(),
                position: start,
            })
    }
}

/// Resolve backslash escapes inside a literal
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_comparison_tokens() {
        assert_eq!(
            kinds("gameMode >= 1"),
            vec![Token::Ident("gameMode"), Token::Gte, Token::Number(1.0), Token::Eof]
        );
        assert_eq!(
            kinds("a === b !== c != d == e"),
            vec![
                Token::Ident("a"),
                Token::EqEqEq,
                Token::Ident("b"),
                Token::NotEqEq,
                Token::Ident("c"),
                Token::NotEq,
                Token::Ident("d"),
                Token::EqEq,
                Token::Ident("e"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_in_list() {
        assert_eq!(
            kinds("f in ['a', 2]"),
            vec![
                Token::Ident("f"),
                Token::In,
                Token::LBracket,
                Token::Str("a".to_string()),
                Token::Comma,
                Token::Number(2.0),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_literal_content_is_opaque() {
        let tokens = kinds("f == 'a; DROP TABLE || x'");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("f"),
                Token::EqEq,
                Token::Str("a; DROP TABLE || x".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let tokens = kinds(r#"f == "say \"hi\"""#);
        assert_eq!(tokens[2], Token::Str("say \"hi\"".to_string()));
    }

    #[test]
    fn test_decimal_numbers() {
        assert_eq!(kinds("0.5")[0], Token::Number(0.5));
        assert_eq!(kinds(".25")[0], Token::Number(0.25));
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a  && b").unwrap();
        assert_eq!(tokens[1].position, 3);
        assert_eq!(tokens[2].position, 6);
        assert_eq!(tokens[3].position, 7);
    }

    #[test]
    fn test_rejects_foreign_characters() {
        assert_eq!(
            tokenize("f = 1"),
            Err(CompileError::UnexpectedChar {
                found: '=',
                position: 2
            })
        );
        assert!(matches!(
            tokenize("f; x"),
            Err(CompileError::UnexpectedChar { found: ';', .. })
        ));
        assert!(matches!(
            tokenize("f & 1"),
            Err(CompileError::UnexpectedChar { found: '&', .. })
        ));
        assert!(matches!(
            tokenize("{f}"),
            Err(CompileError::UnexpectedChar { found: '{', .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("f == 'abc"),
            Err(CompileError::UnterminatedString { position: 5 })
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tokenize("   "), Err(CompileError::EmptyInput));
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::Ident("x").to_string(), "identifier 'x'");
        assert_eq!(Token::AndAnd.to_string(), "'&&'");
        assert_eq!(Token::Eof.to_string(), "end of input");
    }
}
