//! Error types for the actor state store

use shared_types::BlockId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The block is running an action for this actor.
    #[error("block {block} is busy for actor {actor}")]
    Busy { block: BlockId, actor: String },
}
