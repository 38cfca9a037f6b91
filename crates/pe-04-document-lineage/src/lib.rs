//! # Document Lineage
//!
//! Builds, submits and persists verifiable documents, keeping the
//! relationships between them.
//!
//! ## Architecture
//!
//! ```text
//!  ┌───────────────────────┐      ┌──────────────────────────────┐
//!  │ SendToLedgerBlock     │      │ Request / Mint blocks        │
//!  └──────────┬────────────┘      └──────────────┬───────────────┘
//!             └───────────────┬──────────────────┘
//!                             ▼
//!                   ┌───────────────────┐
//!                   │ DocumentLineage   │  domain
//!                   └─────────┬─────────┘
//!        ┌─────────────┬──────┴──────┬─────────────┬────────────┐
//!        ▼             ▼             ▼             ▼            ▼
//!   Repository   LedgerAdapter  CredentialHelper  Wallet   TopicResolver   ports
//! ```
//!
//! ## Guarantees
//!
//! - A relationship always names a document that is already persisted and
//!   on the ledger.
//! - The presentation of a two-phase submission is only built once the
//!   credential has a concrete message id.
//! - Nothing is retried; a failed submission surfaces as `SubmissionFailed`.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod blocks;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::{
    DigestCredentialHelper, InMemoryLedger, InMemoryRepository, InMemoryWallet,
    RepositoryReferences, StaticTopicResolver,
};
pub use blocks::{SendToLedgerBlock, SendToLedgerOptions, SEND_TO_LEDGER_BLOCK};
pub use domain::{
    collection_for, AggregateSubmission, Collaborators, DocumentLineage, RecordMetadata,
    SchemaCache, SubmittedDocument,
};
pub use error::{LineageError, LineageResult};
pub use ports::{
    Collection, CredentialHelper, DidMaterial, Filter, KeyType, LedgerAdapter, Repository,
    SubjectVerification, TopicKind, TopicResolver, Wallet,
};
