// SPDX-License-Identifier: MIT

//! Text condition expression parser
//!
//! Parses expressions like:
//! - `gameMode >= 1 && region < 3`
//! - `(field1 == 1 && field2 in ['a', 'b']) || field1 % 2 == 1`
//!
//! Precedence, loosest first: `||`, `&&`, equality (`== != === !==`),
//! relational (`< <= > >= in`), additive, multiplicative, prefix
//! (`! - + ~`). Binary operators are left-associative.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{tokenize, SpannedToken, Token};
use crate::error::CompileError;

/// Maximum accepted expression size in bytes
pub const MAX_INPUT_BYTES: usize = 64 * 1024;
/// Maximum nesting of parentheses, lists and prefix operators
pub const MAX_NESTING: usize = 32;
/// Maximum depth of the parsed tree, counting every operator and list node
pub const MAX_DEPTH: usize = 256;

/// Parse a condition expression string into an AST
pub fn parse(input: &str) -> Result<Expr, CompileError> {
    if input.len() > MAX_INPUT_BYTES {
        return Err(CompileError::InputTooLarge {
            max_bytes: MAX_INPUT_BYTES,
            actual_bytes: input.len(),
        });
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let (expr, _) = parser.parse_expression(0)?;
    parser.expect_eof()?;
    Ok(expr)
}

/// A parsed subtree and the depth of its deepest path
type Parsed = (Expr, usize);

/// What an infix token does once parsed
#[derive(Clone, Copy)]
enum Infix {
    Or,
    And,
    Op(BinaryOp),
}

/// Binding power for an infix token, `None` for anything else
fn infix(token: &Token<'_>) -> Option<(u8, Infix)> {
    let entry = match token {
        Token::OrOr => (1, Infix::Or),
        Token::AndAnd => (2, Infix::And),
        Token::EqEq => (3, Infix::Op(BinaryOp::Eq)),
        Token::NotEq => (3, Infix::Op(BinaryOp::NotEq)),
        Token::EqEqEq => (3, Infix::Op(BinaryOp::StrictEq)),
        Token::NotEqEq => (3, Infix::Op(BinaryOp::StrictNotEq)),
        Token::Lt => (4, Infix::Op(BinaryOp::Lt)),
        Token::Lte => (4, Infix::Op(BinaryOp::Lte)),
        Token::Gt => (4, Infix::Op(BinaryOp::Gt)),
        Token::Gte => (4, Infix::Op(BinaryOp::Gte)),
        Token::In => (4, Infix::Op(BinaryOp::In)),
        Token::Plus => (5, Infix::Op(BinaryOp::Add)),
        Token::Minus => (5, Infix::Op(BinaryOp::Sub)),
        Token::Star => (6, Infix::Op(BinaryOp::Mul)),
        Token::Slash => (6, Infix::Op(BinaryOp::Div)),
        Token::Percent => (6, Infix::Op(BinaryOp::Rem)),
        _ => return None,
    };
    Some(entry)
}

/// Depth of a node whose deepest child has depth `depth`
fn deepen(depth: usize, position: usize) -> Result<usize, CompileError> {
    let depth = depth + 1;
    if depth > MAX_DEPTH {
        return Err(CompileError::NestingTooDeep {
            max_depth: MAX_DEPTH,
            depth,
            position,
        });
    }
    Ok(depth)
}

struct Parser<'a> {
    tokens: Vec<SpannedToken<'a>>,
    index: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<SpannedToken<'a>>) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
        }
    }

    /// Parse operators binding at least as tightly as `min_bp`
    ///
    /// Chains like `1 + 1 + 1` are folded in a loop, so their depth is
    /// tracked here rather than by `with_nesting`.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Parsed, CompileError> {
        let (mut left, mut depth) = self.parse_prefix()?;

        while let Some((bp, kind)) = infix(&self.current().token) {
            if bp < min_bp {
                break;
            }
            let position = self.current().position;
            self.advance();
            let (right, right_depth) = self.parse_expression(bp + 1)?;
            depth = deepen(depth.max(right_depth), position)?;
            left = match kind {
                Infix::Or => Expr::Or(Box::new(left), Box::new(right)),
                Infix::And => Expr::And(Box::new(left), Box::new(right)),
                Infix::Op(op) => Expr::binary(op, left, right),
            };
        }

        Ok((left, depth))
    }

    fn parse_prefix(&mut self) -> Result<Parsed, CompileError> {
        let position = self.current().position;
        let op = match self.current().token {
            Token::Bang => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Neg),
            Token::Plus => Some(UnaryOp::Plus),
            Token::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                self.with_nesting(position, |parser| {
                    let (operand, depth) = parser.parse_prefix()?;
                    Ok((Expr::unary(op, operand), deepen(depth, position)?))
                })
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Parsed, CompileError> {
        let SpannedToken { token, position } = self.current().clone();
        match token {
            Token::Number(n) => {
                self.advance();
                Ok((Expr::Number(n), 1))
            }
            Token::Str(s) => {
                self.advance();
                Ok((Expr::Str(s), 1))
            }
            Token::Ident(name) => {
                self.advance();
                Ok((Expr::Field(name.to_string()), 1))
            }
            Token::LParen => {
                self.advance();
                self.with_nesting(position, |parser| {
                    let parsed = parser.parse_expression(0)?;
                    parser.expect(Token::RParen, "')'")?;
                    Ok(parsed)
                })
            }
            Token::LBracket => {
                self.advance();
                self.with_nesting(position, |parser| parser.parse_list(position))
            }
            other => Err(CompileError::UnexpectedToken {
                expected: "expression",
                found: other.to_string(),
                position,
            }),
        }
    }

    /// Parse list elements after the opening bracket at `position`
    fn parse_list(&mut self, position: usize) -> Result<Parsed, CompileError> {
        let mut items = Vec::new();
        let mut depth = 0;
        loop {
            if self.matches(&Token::RBracket) {
                break;
            }
            let (item, item_depth) = self.parse_expression(0)?;
            items.push(item);
            depth = depth.max(item_depth);
            if !self.matches(&Token::Comma) {
                self.expect(Token::RBracket, "',' or ']'")?;
                break;
            }
        }
        Ok((Expr::List(items), deepen(depth, position)?))
    }

    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let depth = self.nesting + 1;
        if depth > MAX_NESTING {
            return Err(CompileError::NestingTooDeep {
                max_depth: MAX_NESTING,
                depth,
                position,
            });
        }
        self.nesting = depth;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn expect(&mut self, token: Token<'_>, expected: &'static str) -> Result<(), CompileError> {
        if self.matches(&token) {
            Ok(())
        } else {
            Err(CompileError::UnexpectedToken {
                expected,
                found: self.current().token.to_string(),
                position: self.current().position,
            })
        }
    }

    fn expect_eof(&self) -> Result<(), CompileError> {
        if self.current().token == Token::Eof {
            Ok(())
        } else {
            Err(CompileError::TrailingInput {
                position: self.current().position,
            })
        }
    }

    /// Consume the current token if it has the same kind as `kind`
    fn matches(&mut self, kind: &Token<'_>) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current(&self) -> &SpannedToken<'a> {
        // tokenize always terminates the stream with Eof and advance never passes it
        &self.tokens[self.index]
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }
}
