use pe_01_block_tree::TreeError;
use pe_03_validation::ValidationResults;
use policy_telemetry::TelemetryError;
use shared_types::BlockActionError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the engine facade.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("policy does not compile: {0}")]
    Tree(#[from] TreeError),

    #[error("policy failed validation with {} error(s)", results.error_count())]
    InvalidPolicy { results: ValidationResults },

    #[error("block could not be instantiated: {0}")]
    Wiring(BlockActionError),

    #[error("no block tagged '{0}'")]
    UnknownBlock(String),

    #[error("block '{tag}' ({block_type}) does not accept actor data")]
    NotAnActionBlock { tag: String, block_type: String },

    #[error(transparent)]
    Action(#[from] BlockActionError),

    #[error("action on '{tag}' did not finish within {after:?}")]
    Timeout { tag: String, after: Duration },

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl EngineError {
    /// The block-scoped failure behind this error, if any.
    pub fn action_error(&self) -> Option<&BlockActionError> {
        match self {
            Self::Wiring(err) | Self::Action(err) => Some(err),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
