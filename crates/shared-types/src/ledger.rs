//! # Ledger Entities
//!
//! Topics, submission results and token definitions exchanged with the
//! ledger adapter.

use crate::entities::{MessageId, TopicId};
use serde::{Deserialize, Serialize};

/// A ledger-addressable channel messages are submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub topic_id: TopicId,
    /// DID of the topic owner.
    pub owner: String,
    #[serde(default)]
    pub description: String,
}

impl Topic {
    pub fn new(topic_id: impl Into<TopicId>, owner: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            owner: owner.into(),
            description: String::new(),
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMessage {
    pub message_id: MessageId,
    pub topic_id: TopicId,
}

/// Token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Fungible,
    NonFungible,
}

/// A token definition stored in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub token_id: String,
    pub token_name: String,
    pub token_symbol: String,
    pub token_type: TokenType,
    /// Decimal places of a fungible token. Ignored for non-fungible tokens.
    #[serde(default)]
    pub decimals: u32,
}

/// Receipt of a token mint operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub transaction_id: String,
    pub token_id: String,
    /// Amount in on-ledger units (smallest denomination or serial count).
    pub amount: u64,
    pub recipient: String,
    /// Serial numbers created, for non-fungible tokens.
    #[serde(default)]
    pub serials: Vec<u64>,
}
