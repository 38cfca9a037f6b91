//! # Request Block
//!
//! The actor-facing entry point of a policy: an actor submits data, the
//! block turns it into a signed document, lets its validator children
//! check it and emits it downstream.
//!
//! ## Modules
//!
//! - `request`: the request block and its outcome types
//! - `validator_block`: the document validator child block
//! - `options`: typed options, payload and option rules

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod options;
pub mod request;
pub mod validator_block;

pub use error::{RequestError, RequestResult};
pub use options::{IdType, RequestBlockOptions, RequestPayload};
pub use request::{Rejection, RequestBlock, RequestOutcome, REQUEST_BLOCK};
pub use validator_block::{
    Condition, ConditionKind, DocumentValidatorBlock, DocumentValidatorOptions,
    DOCUMENT_VALIDATOR_BLOCK,
};
