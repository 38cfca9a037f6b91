//! # pe-03-validation
//!
//! Publish-time validation of a compiled policy.
//!
//! ```text
//! BlockTree ──→ ValidationPipeline ──→ ValidationResults
//!                 ├── EventLinkValidator   (every block)
//!                 ├── PlacementValidator   (every block)
//!                 └── per block type       (RuleSet, custom validators)
//! ```
//!
//! The policy is valid when the results container is empty. Errors surface
//! as (block uuid, message) pairs.

pub mod pipeline;
pub mod ports;
pub mod results;
pub mod rules;
pub mod validator;

pub use pipeline::{ValidationPipeline, UNHANDLED_VALIDATION_ERROR};
pub use ports::{AcceptAllReferences, ReferenceKind, ReferenceResolver};
pub use results::ValidationResults;
pub use rules::{OptionRule, OptionsCheck, RuleSet};
pub use validator::{BlockValidator, EventLinkValidator, PlacementValidator, ValidationContext};
