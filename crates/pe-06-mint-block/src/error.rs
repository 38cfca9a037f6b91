//! Error types for the mint block and its rule language.

use pe_04_document_lineage::LineageError;
use shared_types::{ActionErrorKind, BlockActionError, BlockRef, CollaboratorError};
use thiserror::Error;

/// Errors raised while reading an aggregation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Parse error at column {col}: {message}")]
    ParseError { col: usize, message: String },

    #[error("Unexpected token: expected {expected}, found '{found}'")]
    UnexpectedToken { expected: String, found: String },

    #[error("Unexpected end of rule: expected {0}")]
    UnexpectedEnd(String),

    #[error("Empty rule")]
    Empty,
}

pub type RuleResult<T> = Result<T, RuleError>;

/// Failures of a mint run.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("token {0} not found")]
    BadTokenId(String),

    #[error("bad input document: {0}")]
    BadDocument(String),

    #[error("no recipient account could be resolved")]
    NoRecipient,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid rule: {0}")]
    Rule(#[from] RuleError),

    #[error("mint failed: {0}")]
    Mint(CollaboratorError),

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

impl MintError {
    pub fn into_action_error(self, block: &BlockRef) -> BlockActionError {
        let kind = match self {
            Self::Lineage(err) => return err.into_action_error(block),
            Self::BadTokenId(_) => ActionErrorKind::BadTokenId,
            Self::BadDocument(_) => ActionErrorKind::BadDocument,
            Self::NoRecipient => ActionErrorKind::NoRecipient,
            Self::InvalidAmount(_) => ActionErrorKind::InvalidAmount,
            Self::Rule(_) => ActionErrorKind::Configuration,
            Self::Mint(_) => ActionErrorKind::SubmissionFailed,
        };
        BlockActionError::new(block, kind, self.to_string())
    }
}

pub type MintResult<T> = Result<T, MintError>;
