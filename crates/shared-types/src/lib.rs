//! # Shared Types Crate
//!
//! This crate contains the domain entities shared by every policy engine
//! crate: identifiers, actors, policy events, block descriptors, document
//! records, credential envelopes and the block-scoped error types.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Stable Persistence Layout**: `DocumentRecord` serializes with the field
//!   names downstream consumers resolve lineage by (`messageId`,
//!   `relationships`, ...). Renaming a field is a breaking change.
//! - **Descriptors are data**: block types are described by immutable
//!   `BlockDescriptor` values, never by type hierarchies.

pub mod descriptor;
pub mod documents;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod ledger;

pub use descriptor::*;
pub use documents::*;
pub use entities::*;
pub use envelope::{lookup_path, Envelope, EnvelopeKind};
pub use errors::*;
pub use events::*;
pub use ledger::*;
