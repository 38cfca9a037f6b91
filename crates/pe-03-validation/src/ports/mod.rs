//! Driven ports of the validation pipeline.

use async_trait::async_trait;
use shared_types::CollaboratorError;
use std::fmt;

/// Kinds of records a block option can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Schema IRI.
    Schema,
    /// Token id.
    Token,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => f.write_str("schema"),
            Self::Token => f.write_str("token"),
        }
    }
}

/// Checks that referenced records exist. Backed by the repository.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn exists(&self, kind: ReferenceKind, id: &str) -> Result<bool, CollaboratorError>;
}

/// Resolver that accepts every reference. Used when a policy is checked
/// without access to storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllReferences;

#[async_trait]
impl ReferenceResolver for AcceptAllReferences {
    async fn exists(&self, _kind: ReferenceKind, _id: &str) -> Result<bool, CollaboratorError> {
        Ok(true)
    }
}
