//! # Error Types
//!
//! Errors shared by every block implementation and every collaborator port.

use crate::entities::{BlockId, BlockRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Categories of runtime block failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionErrorKind {
    /// Actor has no identity or the block is not active for the actor.
    Unavailable,
    /// A referenced prior document could not be resolved.
    InvalidRelationships,
    /// The credential subject failed verification.
    SubjectInvalid,
    /// A validator child rejected the document.
    DocumentInvalid,
    /// The configured schema is not loaded.
    SchemaUnresolved,
    /// The configured token does not exist.
    BadTokenId,
    /// No usable input documents.
    BadDocument,
    /// No ledger account to send tokens to.
    NoRecipient,
    /// The computed amount is not representable on the ledger.
    InvalidAmount,
    /// The ledger refused or failed a submission.
    SubmissionFailed,
    /// The repository failed.
    Storage,
    /// The wallet failed.
    Wallet,
    /// The credential helper failed.
    Credential,
    /// The block options are unusable at runtime.
    Configuration,
    /// Anything else, including exceeded action deadlines.
    Internal,
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A runtime failure scoped to one block instance.
///
/// Always surfaced to the caller; the dispatcher also records it on the
/// failing delivery branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockActionError {
    pub block_type: String,
    pub block_id: BlockId,
    pub kind: ActionErrorKind,
    pub message: String,
}

impl BlockActionError {
    pub fn new(block: &BlockRef, kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            block_type: block.block_type.clone(),
            block_id: block.id.clone(),
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(block: &BlockRef, message: impl Into<String>) -> Self {
        Self::new(block, ActionErrorKind::Unavailable, message)
    }

    /// Map a collaborator failure to the matching action error kind.
    pub fn from_collaborator(block: &BlockRef, err: CollaboratorError) -> Self {
        let kind = match &err {
            CollaboratorError::Storage(_) => ActionErrorKind::Storage,
            CollaboratorError::Submission(_) | CollaboratorError::Topic(_) => {
                ActionErrorKind::SubmissionFailed
            }
            CollaboratorError::Wallet(_) => ActionErrorKind::Wallet,
            CollaboratorError::Credential(_) => ActionErrorKind::Credential,
        };
        Self::new(block, kind, err.to_string())
    }
}

impl fmt::Display for BlockActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}: {}",
            self.block_type, self.block_id, self.kind, self.message
        )
    }
}

impl std::error::Error for BlockActionError {}

/// Error type of every external collaborator port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("ledger submission failed: {0}")]
    Submission(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("topic unavailable: {0}")]
    Topic(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PolicyId;

    fn block() -> BlockRef {
        BlockRef {
            id: BlockId::new("b-1"),
            block_type: "mintDocumentBlock".into(),
            tag: "mint".into(),
            policy_id: PolicyId::new("p"),
            topic_id: None,
        }
    }

    #[test]
    fn test_display_is_block_scoped() {
        let err = BlockActionError::new(&block(), ActionErrorKind::InvalidAmount, "NaN");
        assert_eq!(err.to_string(), "[mintDocumentBlock:b-1] InvalidAmount: NaN");
    }

    #[test]
    fn test_collaborator_mapping() {
        let err = BlockActionError::from_collaborator(
            &block(),
            CollaboratorError::Submission("timeout".into()),
        );
        assert_eq!(err.kind, ActionErrorKind::SubmissionFailed);
        assert!(err.message.contains("timeout"));
    }
}
