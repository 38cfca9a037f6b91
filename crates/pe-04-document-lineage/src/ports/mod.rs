//! Ports layer (Hexagonal Architecture).

pub mod outbound;

pub use outbound::{
    Collection, CredentialHelper, DidMaterial, Filter, KeyType, LedgerAdapter, Repository,
    SubjectVerification, TopicKind, TopicResolver, Wallet,
};
