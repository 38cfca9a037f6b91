//! Error types for the block registry and block tree

use shared_types::BlockId;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("block type already registered: {0}")]
    DuplicateBlockType(String),

    #[error("unknown block type: {0}")]
    UnknownBlockType(String),
}

/// Block tree errors, raised while compiling a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The parent's children policy forbids the child type.
    #[error("{parent_type} does not allow children of type {child_type}")]
    ChildrenNotAllowed {
        parent_type: String,
        child_type: String,
    },

    #[error("duplicate block id: {0}")]
    DuplicateBlockId(BlockId),

    #[error("duplicate block tag: {0}")]
    DuplicateTag(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// The tree already has a root.
    #[error("policy already has a root block")]
    RootAlreadySet,

    /// `build` was called before a root was added.
    #[error("policy has no root block")]
    MissingRoot,

    #[error("invalid policy document: {0}")]
    InvalidConfig(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
