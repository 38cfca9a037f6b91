//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports that need no external service.

mod credentials;
mod memory;
mod references;

pub use credentials::{DigestCredentialHelper, CREDENTIALS_CONTEXT, DID_CONTEXT, PROOF_TYPE};
pub use memory::{
    InMemoryLedger, InMemoryRepository, InMemoryWallet, SentMessage, StaticTopicResolver,
    MAX_SERIALS_PER_MINT,
};
pub use references::RepositoryReferences;
