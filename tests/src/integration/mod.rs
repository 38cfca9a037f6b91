//! Cross-crate flows.

pub mod concurrency;
pub mod mint_flow;
pub mod publish_validation;
pub mod request_flow;
