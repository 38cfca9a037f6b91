//! # Policy Runtime
//!
//! Installs the built-in block types and turns authored policies into
//! running block graphs.
//!
//! ## Architectural Patterns
//!
//! - **Descriptors as data**: one read-only registry per process
//! - **Hexagonal Architecture**: collaborators come in as port traits, the
//!   runtime only wraps them (metrics) and hands them to the blocks
//! - **Event routing**: blocks talk through the dispatcher only
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = PolicyEngine::new(EngineConfig::from_env(), collaborators, root)?;
//! let policy = engine.publish_json(&definition).await?;
//! let outcome = policy.set_data("submit_report", &actor, payload).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod engine;
pub mod errors;
pub mod registry;
pub mod wiring;

pub use config::{EngineConfig, DEFAULT_ACTION_TIMEOUT_MS};
pub use engine::{PolicyEngine, PublishedPolicy};
pub use errors::{EngineError, EngineResult};
pub use registry::{builtin, builtin_descriptors, builtin_pipeline, INTERFACE_CONTAINER_BLOCK};
