//! Parser: turns rule tokens into an expression tree.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | PATH | '(' expr ')'
//! ```
//!
//! Rules are bounded: at most [`MAX_DEPTH`] nested parentheses or unary
//! minus signs, and at most [`MAX_TOKENS`] tokens. Evaluation recurses over
//! the tree, so both limits also bound evaluation depth.

use crate::error::{RuleError, RuleResult};
use crate::rule::lexer::{Lexer, Token, TokenKind};

/// Deepest allowed nesting of parentheses and unary minus.
pub const MAX_DEPTH: usize = 64;

/// Longest allowed rule, in tokens.
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Dotted path into the credential subject.
    Field(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Parse a complete rule.
    pub fn parse(input: &str) -> RuleResult<Expr> {
        let tokens = Lexer::new(input).tokenize()?;
        // The trailing Eof token does not count.
        if let Some(extra) = tokens.get(MAX_TOKENS) {
            if extra.kind != TokenKind::Eof {
                return Err(RuleError::ParseError {
                    col: extra.col,
                    message: format!("rule is longer than {MAX_TOKENS} tokens"),
                });
            }
        }
        let mut parser = Self {
            tokens,
            pos: 0,
            depth: 0,
        };
        if parser.check(TokenKind::Eof) {
            return Err(RuleError::Empty);
        }
        let expr = parser.parse_expr()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn parse_expr(&mut self) -> RuleResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_term(&mut self) -> RuleResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> RuleResult<Expr> {
        if self.check(TokenKind::Minus) {
            self.advance();
            let inner = self.nested(Self::parse_unary)?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> RuleResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                token
                    .text
                    .parse::<f64>()
                    .map(Expr::Number)
                    .map_err(|_| RuleError::ParseError {
                        col: token.col,
                        message: format!("'{}' is not a valid number", token.text),
                    })
            }
            TokenKind::Path => {
                self.advance();
                Ok(Expr::Field(token.text))
            }
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.nested(Self::parse_expr)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            TokenKind::Eof => Err(RuleError::UnexpectedEnd("number, field or '('".into())),
            _ => Err(RuleError::UnexpectedToken {
                expected: "number, field or '('".into(),
                found: token.text,
            }),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn nested(&mut self, parse: fn(&mut Self) -> RuleResult<Expr>) -> RuleResult<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(RuleError::ParseError {
                col: self.peek().col,
                message: format!("nesting deeper than {MAX_DEPTH} levels"),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> RuleResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else if self.check(TokenKind::Eof) {
            Err(RuleError::UnexpectedEnd(kind.to_string()))
        } else {
            Err(RuleError::UnexpectedToken {
                expected: kind.to_string(),
                found: self.peek().text.clone(),
            })
        }
    }
}
