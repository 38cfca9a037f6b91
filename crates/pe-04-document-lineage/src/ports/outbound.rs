//! Outbound (Driven) ports for document lineage.
//!
//! Every external collaborator the lineage protocol and the action blocks
//! need: persistence, the ledger, credential issuance, key custody and topic
//! lookup. Each is a narrow trait passed in explicitly at construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{
    Actor, BlockRef, CollaboratorError, Envelope, LedgerMessage, MintReceipt, RootAuthority,
    Topic, TokenRecord,
};
use std::fmt;

// =============================================================================
// REPOSITORY
// =============================================================================

/// Persistent collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Schemas,
    DidDocuments,
    VcDocuments,
    VpDocuments,
    Tokens,
}

impl Collection {
    /// Collections that hold documents a relationship may point at.
    pub const DOCUMENTS: [Collection; 3] = [Self::DidDocuments, Self::VcDocuments, Self::VpDocuments];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::DidDocuments => "didDocuments",
            Self::VcDocuments => "vcDocuments",
            Self::VpDocuments => "vpDocuments",
            Self::Tokens => "tokens",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of top-level field equalities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and(field, value)
    }

    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

/// Document storage. Records are JSON objects keyed by their `id` field.
#[async_trait]
pub trait Repository: Send + Sync {
    /// First record in `collection` matching `filter`.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, CollaboratorError>;

    /// Insert or replace (by `id`) a record, returning what was stored.
    async fn save(&self, collection: Collection, record: Value) -> Result<Value, CollaboratorError>;
}

// =============================================================================
// LEDGER
// =============================================================================

/// Append-only ledger the documents and token mints go to.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    async fn send(&self, topic: &Topic, envelope: &Envelope) -> Result<LedgerMessage, CollaboratorError>;

    async fn mint(
        &self,
        token: &TokenRecord,
        amount: u64,
        recipient: &str,
        memo: &str,
    ) -> Result<MintReceipt, CollaboratorError>;
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Outcome of a subject check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubjectVerification {
    pub ok: bool,
    pub error: Option<String>,
}

impl SubjectVerification {
    pub fn valid() -> Self {
        Self { ok: true, error: None }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Fresh DID key material.
#[derive(Debug, Clone)]
pub struct DidMaterial {
    pub did: String,
    pub private_key: String,
    /// The DID document, ready for submission.
    pub envelope: Envelope,
}

/// Issues and checks verifiable documents.
#[async_trait]
pub trait CredentialHelper: Send + Sync {
    async fn create_vc(
        &self,
        issuer: &str,
        issuer_key: &str,
        subject: Value,
    ) -> Result<Envelope, CollaboratorError>;

    async fn create_vp(
        &self,
        issuer: &str,
        issuer_key: &str,
        envelopes: &[Envelope],
        id: &str,
    ) -> Result<Envelope, CollaboratorError>;

    async fn verify_subject(&self, subject: &Value) -> SubjectVerification;

    /// Signature check of a stored document.
    async fn verify_document(&self, document: &Value) -> bool;

    async fn generate_did(&self) -> Result<DidMaterial, CollaboratorError>;
}

// =============================================================================
// WALLET
// =============================================================================

/// Kinds of keys the wallet keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    /// An account's own signing key.
    Key,
    /// Private keys of DIDs generated on an account's behalf.
    DidKeys,
}

#[async_trait]
pub trait Wallet: Send + Sync {
    async fn get_key(
        &self,
        token: &str,
        key_type: KeyType,
        owner: &str,
    ) -> Result<Option<String>, CollaboratorError>;

    async fn set_key(
        &self,
        token: &str,
        key_type: KeyType,
        owner: &str,
        key: String,
    ) -> Result<(), CollaboratorError>;
}

// =============================================================================
// TOPICS
// =============================================================================

/// Which topic a block writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TopicKind {
    /// The policy's root topic.
    #[default]
    Root,
    /// The topic configured on the block (or inherited from its parents).
    Block,
    /// A topic owned by the acting user.
    User,
}

#[async_trait]
pub trait TopicResolver: Send + Sync {
    async fn get_topic(
        &self,
        kind: TopicKind,
        root: &RootAuthority,
        actor: &Actor,
        block: &BlockRef,
    ) -> Result<Topic, CollaboratorError>;

    async fn get_topic_by_id(&self, id: &str, block: &BlockRef) -> Result<Topic, CollaboratorError>;
}
