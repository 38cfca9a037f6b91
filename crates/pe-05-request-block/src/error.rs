//! Error types for the request block.

use pe_02_actor_state::StateError;
use pe_04_document_lineage::LineageError;
use shared_types::{BlockActionError, BlockRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    /// Only actors with a DID may submit documents.
    #[error("actor {0} has no stable identity")]
    NoIdentity(String),

    #[error(transparent)]
    Busy(#[from] StateError),

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

impl RequestError {
    pub fn into_action_error(self, block: &BlockRef) -> BlockActionError {
        match self {
            Self::NoIdentity(_) | Self::Busy(_) => {
                BlockActionError::unavailable(block, self.to_string())
            }
            Self::Lineage(err) => err.into_action_error(block),
        }
    }
}

pub type RequestResult<T> = Result<T, RequestError>;
