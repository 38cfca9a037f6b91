//! In-memory collaborators.
//!
//! Used by tests and by engines that run without external services.

use crate::ports::{Collection, Filter, KeyType, LedgerAdapter, Repository, TopicKind, TopicResolver, Wallet};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use shared_types::{
    Actor, BlockRef, CollaboratorError, Envelope, LedgerMessage, MessageId, MintReceipt,
    RootAuthority, TokenRecord, TokenType, Topic, TopicId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Largest number of serials a single non-fungible mint may produce.
pub const MAX_SERIALS_PER_MINT: u64 = 10_000;

// =============================================================================
// REPOSITORY
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record.
    pub fn insert<T: Serialize>(
        &self,
        collection: Collection,
        record: &T,
    ) -> Result<(), CollaboratorError> {
        let value =
            serde_json::to_value(record).map_err(|e| CollaboratorError::Storage(e.to_string()))?;
        self.upsert(collection, value);
        Ok(())
    }

    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.collections
            .read()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .get(&collection)
            .map_or(0, Vec::len)
    }

    fn upsert(&self, collection: Collection, record: Value) {
        let mut collections = self.collections.write();
        let records = collections.entry(collection).or_default();
        let existing = record
            .get("id")
            .and_then(|id| records.iter().position(|r| r.get("id") == Some(id)));
        match existing {
            Some(index) => records[index] = record,
            None => records.push(record),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, CollaboratorError> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .and_then(|records| records.iter().find(|r| filter.matches(r)).cloned()))
    }

    async fn save(&self, collection: Collection, record: Value) -> Result<Value, CollaboratorError> {
        if !record.is_object() {
            return Err(CollaboratorError::Storage(format!(
                "{collection} records must be objects"
            )));
        }
        self.upsert(collection, record.clone());
        Ok(record)
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// A message accepted by the in-memory ledger.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message_id: MessageId,
    pub topic_id: TopicId,
    pub envelope: Envelope,
}

/// Ledger that keeps everything in memory.
///
/// Message ids look like consensus timestamps: `<seconds>.<sequence>`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    sequence: AtomicU64,
    next_serial: AtomicU64,
    sent: RwLock<Vec<SentMessage>>,
    mints: RwLock<Vec<MintReceipt>>,
    failure: RwLock<Option<String>>,
    blank_ids: AtomicBool,
    latency: RwLock<Option<Duration>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of envelopes accepted.
    pub fn submissions(&self) -> usize {
        self.sent.read().len()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().clone()
    }

    pub fn mints(&self) -> Vec<MintReceipt> {
        self.mints.read().clone()
    }

    /// Make every following call fail with `reason` (or succeed again).
    pub fn fail_with(&self, reason: Option<&str>) {
        *self.failure.write() = reason.map(str::to_string);
    }

    /// Accept envelopes but answer with an empty message id.
    pub fn return_blank_ids(&self, blank: bool) {
        self.blank_ids.store(blank, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = Some(latency);
    }

    async fn enter(&self) -> Result<u64, CollaboratorError> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = self.failure.read().clone() {
            return Err(CollaboratorError::Submission(reason));
        }
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl LedgerAdapter for InMemoryLedger {
    async fn send(&self, topic: &Topic, envelope: &Envelope) -> Result<LedgerMessage, CollaboratorError> {
        let sequence = self.enter().await?;
        let message_id = if self.blank_ids.load(Ordering::SeqCst) {
            MessageId::default()
        } else {
            MessageId::new(format!(
                "{}.{:09}",
                chrono::Utc::now().timestamp(),
                sequence
            ))
        };

        if !message_id.is_empty() {
            self.sent.write().push(SentMessage {
                message_id: message_id.clone(),
                topic_id: topic.topic_id.clone(),
                envelope: envelope.clone(),
            });
        }
        debug!(topic_id = %topic.topic_id, message_id = %message_id, "Ledger message accepted");

        Ok(LedgerMessage {
            message_id,
            topic_id: topic.topic_id.clone(),
        })
    }

    async fn mint(
        &self,
        token: &TokenRecord,
        amount: u64,
        recipient: &str,
        memo: &str,
    ) -> Result<MintReceipt, CollaboratorError> {
        let sequence = self.enter().await?;
        if amount == 0 {
            return Err(CollaboratorError::Submission("amount must be positive".into()));
        }

        let serials = match token.token_type {
            TokenType::Fungible => Vec::new(),
            TokenType::NonFungible => {
                if amount > MAX_SERIALS_PER_MINT {
                    return Err(CollaboratorError::Submission(format!(
                        "cannot mint {amount} serials at once"
                    )));
                }
                let first = self.next_serial.fetch_add(amount, Ordering::SeqCst) + 1;
                (first..first + amount).collect()
            }
        };

        let receipt = MintReceipt {
            transaction_id: format!("{}@{}.{:09}", token.token_id, chrono::Utc::now().timestamp(), sequence),
            token_id: token.token_id.clone(),
            amount,
            recipient: recipient.to_string(),
            serials,
        };
        debug!(token_id = %token.token_id, amount, recipient, memo, "Tokens minted");
        self.mints.write().push(receipt.clone());
        Ok(receipt)
    }
}

// =============================================================================
// WALLET
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryWallet {
    keys: RwLock<HashMap<(String, KeyType, String), String>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key(
        self,
        token: impl Into<String>,
        key_type: KeyType,
        owner: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.keys
            .write()
            .insert((token.into(), key_type, owner.into()), key.into());
        self
    }
}

#[async_trait]
impl Wallet for InMemoryWallet {
    async fn get_key(
        &self,
        token: &str,
        key_type: KeyType,
        owner: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        Ok(self
            .keys
            .read()
            .get(&(token.to_string(), key_type, owner.to_string()))
            .cloned())
    }

    async fn set_key(
        &self,
        token: &str,
        key_type: KeyType,
        owner: &str,
        key: String,
    ) -> Result<(), CollaboratorError> {
        if key.is_empty() {
            return Err(CollaboratorError::Wallet(format!("empty key for {owner}")));
        }
        self.keys
            .write()
            .insert((token.to_string(), key_type, owner.to_string()), key);
        Ok(())
    }
}

// =============================================================================
// TOPICS
// =============================================================================

/// Topic resolver over a fixed root topic plus registered topics.
///
/// User topics are created on first use.
#[derive(Debug)]
pub struct StaticTopicResolver {
    root: Topic,
    topics: RwLock<HashMap<TopicId, Topic>>,
}

impl StaticTopicResolver {
    pub fn new(root: Topic) -> Self {
        let mut topics = HashMap::new();
        topics.insert(root.topic_id.clone(), root.clone());
        Self {
            root,
            topics: RwLock::new(topics),
        }
    }

    pub fn register(&self, topic: Topic) {
        self.topics.write().insert(topic.topic_id.clone(), topic);
    }

    fn lookup(&self, id: &str) -> Option<Topic> {
        self.topics.read().get(&TopicId::new(id)).cloned()
    }
}

#[async_trait]
impl TopicResolver for StaticTopicResolver {
    async fn get_topic(
        &self,
        kind: TopicKind,
        _root: &RootAuthority,
        actor: &Actor,
        block: &BlockRef,
    ) -> Result<Topic, CollaboratorError> {
        match kind {
            TopicKind::Root => Ok(self.root.clone()),
            TopicKind::Block => match &block.topic_id {
                Some(id) => self.get_topic_by_id(id.as_str(), block).await,
                None => Ok(self.root.clone()),
            },
            TopicKind::User => {
                let id = TopicId::new(format!("{}/{}", self.root.topic_id, actor.state_key()));
                let topic = self
                    .topics
                    .write()
                    .entry(id.clone())
                    .or_insert_with(|| Topic::new(id, actor.state_key()))
                    .clone();
                Ok(topic)
            }
        }
    }

    async fn get_topic_by_id(&self, id: &str, block: &BlockRef) -> Result<Topic, CollaboratorError> {
        self.lookup(id).ok_or_else(|| {
            CollaboratorError::Topic(format!("topic {id} is not known to {}", block.id))
        })
    }
}
