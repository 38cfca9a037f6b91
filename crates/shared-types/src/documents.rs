//! # Document Records
//!
//! The persisted form of every envelope the engine creates, and the schema
//! definitions credential subjects are built from.

use crate::entities::{MessageId, PolicyId, TopicId};
use crate::envelope::first_subject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Account map key used for the owner's ledger account.
pub const DEFAULT_ACCOUNT: &str = "default";

/// Lifecycle status of a persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Created, not yet on the ledger.
    #[default]
    New,
    /// Submitted to a ledger topic.
    Submitted,
    /// The tokens described by this document were minted.
    Minted,
}

/// A persisted document.
///
/// The serialized field names are part of the external contract: downstream
/// consumers follow `relationships` (message ids) to resolve lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Record id (the envelope id).
    pub id: String,
    /// Content hash of `document`.
    pub hash: String,
    /// Sealed envelope content.
    pub document: Value,
    /// Owner DID.
    pub owner: String,
    /// Type tag (schema entity, `mint`, `vp`, `did`, ...).
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Policy the record was created under.
    pub policy_id: PolicyId,
    /// Tag of the block that created the record.
    pub tag: String,
    /// Schema IRI, for schema-based documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Ledger message id. Absent until submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    /// Ledger topic the record was submitted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<TopicId>,
    /// Message ids of causally prior records.
    #[serde(default)]
    pub relationships: Vec<MessageId>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: DocumentStatus,
    /// Named ledger accounts attached at creation (`default` = owner account).
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// First credential subject of the sealed document.
    pub fn subject(&self) -> Option<&Value> {
        first_subject(&self.document)
    }

    /// Returns true once the record carries a ledger message id.
    pub fn is_submitted(&self) -> bool {
        self.message_id.as_ref().is_some_and(|id| !id.is_empty())
    }

    /// Owner's ledger account, if one was attached.
    pub fn owner_account(&self) -> Option<&str> {
        self.accounts
            .get(DEFAULT_ACCOUNT)
            .map(String::as_str)
            .filter(|account| !account.is_empty())
    }

    /// The only mutation allowed after submission.
    pub fn mark_minted(&mut self) {
        self.status = DocumentStatus::Minted;
    }
}

/// A credential schema as loaded from the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Schema IRI referenced by block options.
    pub iri: String,
    /// Human-readable name.
    pub name: String,
    /// JSON-LD context URL merged into every subject.
    pub context_url: String,
    /// Entity type name written as the subject `type`.
    pub entity_type: String,
    /// Topic the schema was published to.
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    /// Fields a subject must carry.
    #[serde(default)]
    pub required_fields: Vec<String>,
}
