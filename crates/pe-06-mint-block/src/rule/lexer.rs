//! Lexer: tokenizes an aggregation rule.
//!
//! Produces numbers, dotted field paths, the four arithmetic operators and
//! parentheses.

use crate::error::{RuleError, RuleResult};
use std::fmt;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw text of the token
    pub text: String,
    /// Column number (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            col,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    /// A field path such as `amount` or `meter.reading`.
    Path,
    Plus,
    Minus,
    Star,
    Slash,
    OpenParen,
    CloseParen,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Path => write!(f, "field"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::Eof => write!(f, "end of rule"),
        }
    }
}

fn is_path_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '@' || ch == '$'
}

fn is_path_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '@' | '$' | '.')
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> RuleResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            while self.peek_at(0).is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            let Some(ch) = self.peek_at(0) else {
                tokens.push(Token::new(TokenKind::Eof, "", self.pos + 1));
                break;
            };
            tokens.push(self.next_token(ch)?);
        }
        Ok(tokens)
    }

    fn next_token(&mut self, ch: char) -> RuleResult<Token> {
        let col = self.pos + 1;
        let single = |kind| Token::new(kind, ch.to_string(), col);
        let token = match ch {
            '+' => single(TokenKind::Plus),
            '-' => single(TokenKind::Minus),
            '*' => single(TokenKind::Star),
            '/' => single(TokenKind::Slash),
            '(' => single(TokenKind::OpenParen),
            ')' => single(TokenKind::CloseParen),
            c if c.is_ascii_digit() || c == '.' => return self.read_number(),
            c if is_path_start(c) => return Ok(self.read_path()),
            _ => {
                return Err(RuleError::ParseError {
                    col,
                    message: format!("Unexpected character: '{ch}'"),
                })
            }
        };
        self.pos += 1;
        Ok(token)
    }

    fn read_number(&mut self) -> RuleResult<Token> {
        let col = self.pos + 1;
        let mut text = String::new();
        while let Some(ch) = self.peek_at(0).filter(|c| c.is_ascii_digit() || *c == '.') {
            text.push(ch);
            self.pos += 1;
        }
        if text.parse::<f64>().is_err() {
            return Err(RuleError::ParseError {
                col,
                message: format!("'{text}' is not a valid number"),
            });
        }
        Ok(Token::new(TokenKind::Number, text, col))
    }

    fn read_path(&mut self) -> Token {
        let col = self.pos + 1;
        let mut text = String::new();
        while let Some(ch) = self.peek_at(0).filter(|c| is_path_char(*c)) {
            text.push(ch);
            self.pos += 1;
        }
        Token::new(TokenKind::Path, text, col)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_expression() {
        assert_eq!(
            kinds("(meter.reading - 1.5) * 2"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Path,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::CloseParen,
                TokenKind::Star,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_path_keeps_dots() {
        let tokens = Lexer::new("site.meters.0.kwh").tokenize().unwrap();
        assert_eq!(tokens[0].text, "site.meters.0.kwh");
    }

    #[test]
    fn test_bad_number() {
        assert!(Lexer::new("1.2.3").tokenize().is_err());
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("amount % 2").tokenize().unwrap_err();
        assert_eq!(
            err,
            RuleError::ParseError {
                col: 8,
                message: "Unexpected character: '%'".into()
            }
        );
    }
}
