//! Error types for document lineage.

use shared_types::{ActionErrorKind, BlockActionError, BlockRef, CollaboratorError, MessageId};
use thiserror::Error;

/// Failures of the lineage protocol.
#[derive(Debug, Error)]
pub enum LineageError {
    /// The schema a subject is built against is not loaded.
    #[error("schema not resolved: {0}")]
    SchemaUnresolved(String),

    /// The credential helper refused the subject.
    #[error("subject is invalid: {0}")]
    SubjectInvalid(String),

    /// The ledger did not accept the envelope.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// A relationship names a message that is not persisted yet.
    #[error("relationship {0} does not name a submitted document")]
    ForwardReference(MessageId),

    /// A caller-supplied reference could not be resolved.
    #[error("invalid relationships: {0}")]
    InvalidRelationships(String),

    /// The root authority has no signing key in the wallet.
    #[error("no issuer key for {0}")]
    MissingIssuerKey(String),

    /// A stored record did not have the expected shape.
    #[error("corrupt record in {collection}: {reason}")]
    CorruptRecord {
        collection: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl LineageError {
    /// Scope the error to the block that was acting.
    pub fn into_action_error(self, block: &BlockRef) -> BlockActionError {
        let kind = match &self {
            Self::SchemaUnresolved(_) => ActionErrorKind::SchemaUnresolved,
            Self::SubjectInvalid(_) => ActionErrorKind::SubjectInvalid,
            Self::SubmissionFailed(_) => ActionErrorKind::SubmissionFailed,
            Self::ForwardReference(_) | Self::InvalidRelationships(_) => {
                ActionErrorKind::InvalidRelationships
            }
            Self::MissingIssuerKey(_) => ActionErrorKind::Wallet,
            Self::CorruptRecord { .. } => ActionErrorKind::Storage,
            Self::Collaborator(err) => {
                return BlockActionError::from_collaborator(block, err.clone());
            }
        };
        BlockActionError::new(block, kind, self.to_string())
    }
}

/// Result type for lineage operations.
pub type LineageResult<T> = Result<T, LineageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockId, PolicyId};

    fn block() -> BlockRef {
        BlockRef {
            id: BlockId::new("send-1"),
            block_type: "sendToLedgerBlock".into(),
            tag: "send".into(),
            policy_id: PolicyId::new("p"),
            topic_id: None,
        }
    }

    #[test]
    fn test_forward_reference_is_a_relationship_error() {
        let err = LineageError::ForwardReference(MessageId::new("m-9")).into_action_error(&block());
        assert_eq!(err.kind, ActionErrorKind::InvalidRelationships);
        assert!(err.message.contains("m-9"));
    }

    #[test]
    fn test_collaborator_errors_keep_their_kind() {
        let err = LineageError::from(CollaboratorError::Wallet("locked".into()))
            .into_action_error(&block());
        assert_eq!(err.kind, ActionErrorKind::Wallet);
    }
}
