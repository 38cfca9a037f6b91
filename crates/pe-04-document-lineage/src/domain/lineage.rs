//! # Document Lineage
//!
//! Builds verifiable documents, submits them to the ledger and persists them
//! with their relationships to earlier documents.
//!
//! ## Two-phase aggregate submission
//!
//! ```text
//! phase 1:  VC ──send──→ ledger ──messageId──→ persist ──→ SubmittedDocument
//!                                                               │
//! phase 2:  VP(VC) ──send──→ ledger ──→ persist   ←─────────────┘
//!           relationships = prior ∪ { VC messageId }
//! ```
//!
//! Phase 2 only takes a `SubmittedDocument`, which cannot exist without a
//! concrete message id. A relationship may only name a document that is
//! already persisted and submitted.

use crate::error::{LineageError, LineageResult};
use crate::ports::{
    Collection, CredentialHelper, Filter, KeyType, LedgerAdapter, Repository, TopicKind,
    TopicResolver, Wallet,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared_types::{
    Actor, BlockRef, DocumentRecord, DocumentStatus, Envelope, EnvelopeKind, LedgerMessage,
    MessageId, PolicyId, RootAuthority, Schema, TokenRecord, Topic,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// The external collaborators of the lineage protocol.
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn Repository>,
    pub ledger: Arc<dyn LedgerAdapter>,
    pub credentials: Arc<dyn CredentialHelper>,
    pub wallet: Arc<dyn Wallet>,
    pub topics: Arc<dyn TopicResolver>,
}

/// Descriptive fields of a document record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMetadata {
    pub owner: String,
    pub doc_type: String,
    pub tag: String,
    pub schema: Option<String>,
    pub accounts: BTreeMap<String, String>,
}

/// A document that reached the ledger and was persisted.
#[derive(Debug, Clone)]
pub struct SubmittedDocument {
    record: DocumentRecord,
    message_id: MessageId,
    envelope: Envelope,
}

impl SubmittedDocument {
    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn into_record(self) -> DocumentRecord {
        self.record
    }
}

/// Result of a two-phase submission.
#[derive(Debug, Clone)]
pub struct AggregateSubmission {
    pub vc: SubmittedDocument,
    pub vp: SubmittedDocument,
}

/// Collection a document belongs in, judged by its W3C `type`.
pub fn collection_for(document: &Value) -> Collection {
    let has_type = |name: &str| match document.get("type") {
        Some(Value::Array(items)) => items.iter().any(|t| t == name),
        Some(Value::String(t)) => t == name,
        _ => false,
    };
    if has_type("VerifiablePresentation") {
        Collection::VpDocuments
    } else if has_type("VerifiableCredential") {
        Collection::VcDocuments
    } else {
        Collection::DidDocuments
    }
}

fn dedup(relationships: Vec<MessageId>) -> Vec<MessageId> {
    let mut unique: Vec<MessageId> = Vec::with_capacity(relationships.len());
    for id in relationships {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

/// Lineage service for one published policy.
#[derive(Clone)]
pub struct DocumentLineage {
    collaborators: Collaborators,
    root: RootAuthority,
    policy_id: PolicyId,
}

impl DocumentLineage {
    pub fn new(collaborators: Collaborators, root: RootAuthority, policy_id: PolicyId) -> Self {
        Self {
            collaborators,
            root,
            policy_id,
        }
    }

    pub fn root(&self) -> &RootAuthority {
        &self.root
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    async fn find_typed<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> LineageResult<Option<T>> {
        let Some(value) = self.collaborators.repository.find_one(collection, filter).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| LineageError::CorruptRecord {
                collection: collection.as_str(),
                reason: e.to_string(),
            })
    }

    pub async fn load_schema(&self, iri: &str) -> LineageResult<Option<Schema>> {
        self.find_typed(Collection::Schemas, &Filter::by("iri", iri))
            .await
    }

    pub async fn load_token(&self, token_id: &str) -> LineageResult<Option<TokenRecord>> {
        self.find_typed(Collection::Tokens, &Filter::by("tokenId", token_id))
            .await
    }

    /// First document record matching `filter` in any document collection.
    pub async fn find_document(&self, filter: &Filter) -> LineageResult<Option<DocumentRecord>> {
        for collection in Collection::DOCUMENTS {
            if let Some(record) = self.find_typed(collection, filter).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Relationships for a caller-supplied reference (record id or message
    /// id). The referenced document must already be on the ledger.
    pub async fn resolve_reference(&self, reference: &str) -> LineageResult<Vec<MessageId>> {
        let record = match self.find_document(&Filter::by("id", reference)).await? {
            Some(record) => Some(record),
            None => self.find_document(&Filter::by("messageId", reference)).await?,
        };
        let Some(record) = record else {
            return Err(LineageError::InvalidRelationships(format!(
                "document {reference} not found"
            )));
        };
        match record.message_id.filter(|id| !id.is_empty()) {
            Some(message_id) => Ok(vec![message_id]),
            None => Err(LineageError::InvalidRelationships(format!(
                "document {reference} has not been submitted"
            ))),
        }
    }

    pub async fn topic_for(
        &self,
        kind: TopicKind,
        actor: &Actor,
        block: &BlockRef,
    ) -> LineageResult<Topic> {
        Ok(self
            .collaborators
            .topics
            .get_topic(kind, &self.root, actor, block)
            .await?)
    }

    pub async fn topic_by_id(&self, id: &str, block: &BlockRef) -> LineageResult<Topic> {
        Ok(self.collaborators.topics.get_topic_by_id(id, block).await?)
    }

    // =========================================================================
    // DOCUMENT CONSTRUCTION
    // =========================================================================

    /// Merge the schema's context and type with the caller's fields.
    ///
    /// The schema wins on `@context` and `type`.
    pub fn build_subject(
        &self,
        schema: Option<&Schema>,
        fields: Map<String, Value>,
    ) -> LineageResult<Value> {
        let schema =
            schema.ok_or_else(|| LineageError::SchemaUnresolved("no schema loaded".to_string()))?;

        let mut subject = fields;
        subject.insert(
            "@context".to_string(),
            Value::Array(vec![Value::String(schema.context_url.clone())]),
        );
        subject.insert("type".to_string(), Value::String(schema.entity_type.clone()));
        subject
            .entry("policyId")
            .or_insert_with(|| Value::String(self.policy_id.to_string()));
        Ok(Value::Object(subject))
    }

    /// Credential helper check followed by the schema's required fields.
    pub async fn verify_subject(&self, schema: &Schema, subject: &Value) -> LineageResult<()> {
        let verification = self.collaborators.credentials.verify_subject(subject).await;
        if !verification.ok {
            return Err(LineageError::SubjectInvalid(
                verification
                    .error
                    .unwrap_or_else(|| "rejected by credential helper".to_string()),
            ));
        }

        let missing: Vec<&str> = schema
            .required_fields
            .iter()
            .filter(|field| subject.get(field.as_str()).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(LineageError::SubjectInvalid(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    async fn issuer_key(&self) -> LineageResult<String> {
        self.collaborators
            .wallet
            .get_key(&self.root.wallet_token, KeyType::Key, &self.root.did)
            .await?
            .ok_or_else(|| LineageError::MissingIssuerKey(self.root.did.clone()))
    }

    /// Issue a credential over `subject`, signed by the root authority.
    pub async fn create_document(&self, subject: Value) -> LineageResult<Envelope> {
        let key = self.issuer_key().await?;
        Ok(self
            .collaborators
            .credentials
            .create_vc(&self.root.did, &key, subject)
            .await?)
    }

    /// Record for an envelope that has not been submitted yet.
    pub fn draft(
        &self,
        envelope: &Envelope,
        relationships: Vec<MessageId>,
        metadata: RecordMetadata,
    ) -> DocumentRecord {
        DocumentRecord {
            id: envelope.id.clone(),
            hash: envelope.hash.clone(),
            document: envelope.document.clone(),
            owner: metadata.owner,
            doc_type: metadata.doc_type,
            policy_id: self.policy_id.clone(),
            tag: metadata.tag,
            schema: metadata.schema,
            message_id: None,
            topic_id: None,
            relationships: dedup(relationships),
            status: DocumentStatus::New,
            accounts: metadata.accounts,
        }
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    /// Send one envelope to the ledger. Not retried.
    #[instrument(skip_all, fields(topic_id = %topic.topic_id, envelope_id = %envelope.id))]
    pub async fn submit(&self, topic: &Topic, envelope: &Envelope) -> LineageResult<LedgerMessage> {
        let message = self
            .collaborators
            .ledger
            .send(topic, envelope)
            .await
            .map_err(|e| LineageError::SubmissionFailed(e.to_string()))?;
        if message.message_id.is_empty() {
            return Err(LineageError::SubmissionFailed(format!(
                "ledger returned no message id for {}",
                envelope.id
            )));
        }
        debug!(message_id = %message.message_id, "Envelope submitted");
        Ok(message)
    }

    async fn check_relationships(&self, relationships: &[MessageId]) -> LineageResult<()> {
        for relationship in relationships {
            let submitted = self
                .find_document(&Filter::by("messageId", relationship.as_str()))
                .await?
                .is_some_and(|record| record.is_submitted());
            if !submitted {
                return Err(LineageError::ForwardReference(relationship.clone()));
            }
        }
        Ok(())
    }

    async fn persist(
        &self,
        mut record: DocumentRecord,
        message: Option<&LedgerMessage>,
    ) -> LineageResult<DocumentRecord> {
        if let Some(message) = message {
            record.message_id = Some(message.message_id.clone());
            record.topic_id = Some(message.topic_id.clone());
            record.status = DocumentStatus::Submitted;
        }
        let collection = collection_for(&record.document);
        let value = serde_json::to_value(&record).map_err(|e| LineageError::CorruptRecord {
            collection: collection.as_str(),
            reason: e.to_string(),
        })?;
        self.collaborators.repository.save(collection, value).await?;
        Ok(record)
    }

    /// Attach the ledger message (if any) and persist the record.
    ///
    /// Fails with `ForwardReference` if a relationship does not name a
    /// persisted, submitted document.
    pub async fn link_and_persist(
        &self,
        record: DocumentRecord,
        message: Option<&LedgerMessage>,
    ) -> LineageResult<DocumentRecord> {
        self.check_relationships(&record.relationships).await?;
        self.persist(record, message).await
    }

    async fn submit_with(
        &self,
        topic: &Topic,
        record: DocumentRecord,
        envelope: Envelope,
    ) -> LineageResult<SubmittedDocument> {
        self.check_relationships(&record.relationships).await?;
        let message = self.submit(topic, &envelope).await?;
        let record = self.persist(record, Some(&message)).await?;
        Ok(SubmittedDocument {
            record,
            message_id: message.message_id,
            envelope,
        })
    }

    /// Submit and persist a freshly built envelope.
    pub async fn submit_document(
        &self,
        topic: &Topic,
        envelope: Envelope,
        relationships: Vec<MessageId>,
        metadata: RecordMetadata,
    ) -> LineageResult<SubmittedDocument> {
        let record = self.draft(&envelope, relationships, metadata);
        self.submit_with(topic, record, envelope).await
    }

    /// Submit and persist a record drafted earlier.
    pub async fn submit_record(
        &self,
        topic: &Topic,
        record: DocumentRecord,
    ) -> LineageResult<SubmittedDocument> {
        let kind = match collection_for(&record.document) {
            Collection::VpDocuments => EnvelopeKind::Vp,
            Collection::VcDocuments => EnvelopeKind::Vc,
            _ => EnvelopeKind::Did,
        };
        let issuer = match record.document.get("issuer") {
            Some(Value::String(issuer)) => issuer.clone(),
            Some(Value::Object(issuer)) => issuer
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or(self.root.did.as_str())
                .to_string(),
            _ => self.root.did.clone(),
        };
        let envelope = Envelope {
            id: record.id.clone(),
            kind,
            issuer,
            document: record.document.clone(),
            hash: record.hash.clone(),
        };
        self.submit_with(topic, record, envelope).await
    }

    /// Phase 2: wrap an already submitted document in a presentation and
    /// submit it.
    pub async fn submit_presentation(
        &self,
        topic: &Topic,
        enclosed: &SubmittedDocument,
        prior: &[MessageId],
        metadata: RecordMetadata,
    ) -> LineageResult<SubmittedDocument> {
        let mut relationships = prior.to_vec();
        relationships.push(enclosed.message_id.clone());

        let key = self.issuer_key().await?;
        let id = Uuid::new_v4().to_string();
        let vp = self
            .collaborators
            .credentials
            .create_vp(&self.root.did, &key, std::slice::from_ref(&enclosed.envelope), &id)
            .await?;
        self.submit_document(topic, vp, relationships, metadata)
            .await
    }

    /// Two-phase submission of `vc` and a presentation enclosing it.
    #[instrument(skip_all, fields(topic_id = %topic.topic_id, vc_id = %vc.id))]
    pub async fn submit_aggregate(
        &self,
        topic: &Topic,
        vc: Envelope,
        relationships: Vec<MessageId>,
        vc_metadata: RecordMetadata,
        vp_metadata: RecordMetadata,
    ) -> LineageResult<AggregateSubmission> {
        let vc = self
            .submit_document(topic, vc, relationships.clone(), vc_metadata)
            .await?;
        let vp = self
            .submit_presentation(topic, &vc, &relationships, vp_metadata)
            .await?;
        info!(
            vc_message_id = %vc.message_id,
            vp_message_id = %vp.message_id,
            "Aggregate submitted"
        );
        Ok(AggregateSubmission { vc, vp })
    }

    /// Persist the record again with status `Minted`.
    pub async fn mark_minted(&self, record: &DocumentRecord) -> LineageResult<DocumentRecord> {
        let mut record = record.clone();
        record.mark_minted();
        self.persist(record, None).await
    }

    /// Create a DID for `actor`, put its document on the ledger and keep the
    /// private key in the actor's wallet. Returns the new DID.
    #[instrument(skip_all, fields(actor = %actor.state_key()))]
    pub async fn issue_did(
        &self,
        actor: &Actor,
        topic: &Topic,
        metadata: RecordMetadata,
    ) -> LineageResult<String> {
        let material = self.collaborators.credentials.generate_did().await?;
        let did = material.did.clone();
        self.submit_document(topic, material.envelope, Vec::new(), metadata)
            .await?;
        self.collaborators
            .wallet
            .set_key(&actor.wallet_token, KeyType::DidKeys, &did, material.private_key)
            .await?;
        info!(did = %did, "DID issued");
        Ok(did)
    }
}
