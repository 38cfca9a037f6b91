//! # Request Block
//!
//! Lets an actor submit data that becomes a signed document.
//!
//! ## Per-actor availability
//!
//! ```text
//! Active ──set_data──→ Busy ──success──→ Active ──→ Run + Refresh
//!                        ├──rejected──→ Active (lastError) ──→ nothing emitted
//!                        └──error─────→ Active (lastError) ──→ error returned
//! ```
//!
//! A second `set_data` by the same actor while the first is running is
//! refused, not queued. The busy flag is released before any event is
//! emitted.

use crate::error::{RequestError, RequestResult};
use crate::options::{IdType, RequestBlockOptions, RequestPayload};
use crate::validator_block::{DocumentValidatorBlock, DOCUMENT_VALIDATOR_BLOCK};
use pe_01_block_tree::BlockInstance;
use pe_02_actor_state::ActorStateStore;
use pe_04_document_lineage::{DocumentLineage, RecordMetadata, SchemaCache, TopicKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_bus::{DispatchReport, Dispatcher};
use shared_types::{
    ActionErrorKind, Actor, BlockActionError, BlockDescriptor, BlockId, BlockRef, ChildrenPolicy,
    ControlKind, DocumentRecord, EventState, EventType, DEFAULT_ACCOUNT,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const REQUEST_BLOCK: &str = "requestVcDocumentBlock";

pub fn descriptor() -> BlockDescriptor {
    BlockDescriptor::new(REQUEST_BLOCK)
        .action()
        .with_state()
        .default_event()
        .outputs([EventType::RunEvent, EventType::RefreshEvent])
        .children(ChildrenPolicy::Specific(vec![DOCUMENT_VALIDATOR_BLOCK.to_string()]))
        .control(ControlKind::Ui)
        .describe("Turns actor-submitted data into a signed document")
}

/// A validator child refused the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// The validator block that refused.
    pub block_id: BlockId,
    pub kind: ActionErrorKind,
    pub reasons: Vec<String>,
}

impl Rejection {
    /// The rejection as an error scoped to the request block.
    pub fn into_error(self, block: &BlockRef) -> BlockActionError {
        BlockActionError::new(
            block,
            self.kind,
            format!("rejected by {}: {}", self.block_id, self.reasons.join("; ")),
        )
    }
}

#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Accepted {
        document: DocumentRecord,
        report: DispatchReport,
    },
    Rejected(Rejection),
}

impl RequestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn document(&self) -> Option<&DocumentRecord> {
        match self {
            Self::Accepted { document, .. } => Some(document),
            Self::Rejected(_) => None,
        }
    }
}

enum Produced {
    Document(DocumentRecord),
    Rejected(Rejection),
}

pub struct RequestBlock {
    block: BlockRef,
    options: RequestBlockOptions,
    schema: SchemaCache,
    lineage: Arc<DocumentLineage>,
    state: ActorStateStore,
    validators: Vec<Arc<DocumentValidatorBlock>>,
}

impl RequestBlock {
    /// Build the block. `validators` are its validator-capable descendants.
    pub fn from_instance(
        instance: &BlockInstance,
        lineage: Arc<DocumentLineage>,
        state: ActorStateStore,
        validators: Vec<Arc<DocumentValidatorBlock>>,
    ) -> Result<Self, BlockActionError> {
        let block = instance.block_ref();
        let options: RequestBlockOptions = serde_json::from_value(instance.options.clone())
            .map_err(|e| {
                BlockActionError::new(&block, ActionErrorKind::Configuration, e.to_string())
            })?;
        Ok(Self {
            schema: SchemaCache::new(options.schema.clone()),
            block,
            options,
            lineage,
            state,
            validators,
        })
    }

    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    pub fn options(&self) -> &RequestBlockOptions {
        &self.options
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Submit `payload` on behalf of `actor`.
    #[instrument(skip_all, fields(block_id = %self.block.id, actor = %actor.state_key()))]
    pub async fn set_data(
        &self,
        actor: &Actor,
        payload: RequestPayload,
        dispatcher: &Dispatcher,
    ) -> Result<RequestOutcome, BlockActionError> {
        if !actor.has_identity() {
            return Err(RequestError::NoIdentity(actor.username.clone()).into_action_error(&self.block));
        }
        let mut guard = self
            .state
            .try_acquire(&self.block.id, actor)
            .map_err(|e| RequestError::from(e).into_action_error(&self.block))?;

        let produced = match self.produce(actor, payload).await {
            Ok(produced) => produced,
            Err(err) => {
                warn!(error = %err, "Request failed");
                guard.fail(err.to_string());
                return Err(err.into_action_error(&self.block));
            }
        };

        let document = match produced {
            Produced::Rejected(rejection) => {
                info!(validator = %rejection.block_id, "Document rejected");
                guard.fail(rejection.reasons.join("; "));
                return Ok(RequestOutcome::Rejected(rejection));
            }
            Produced::Document(document) => document,
        };

        guard.complete();
        drop(guard);

        let mut fields = Map::new();
        fields.insert("lastDocumentId".to_string(), Value::String(document.id.clone()));
        self.state.update(&self.block.id, actor, fields);

        let mut report = dispatcher
            .trigger(
                &self.block.id,
                EventType::RunEvent,
                actor,
                EventState::with_documents(vec![document.clone()]),
            )
            .await;
        report.merge(
            dispatcher
                .trigger(
                    &self.block.id,
                    EventType::RefreshEvent,
                    actor,
                    EventState::with_documents(vec![document.clone()]),
                )
                .await,
        );
        info!(document_id = %document.id, "Document produced");
        Ok(RequestOutcome::Accepted { document, report })
    }

    async fn produce(&self, actor: &Actor, payload: RequestPayload) -> RequestResult<Produced> {
        let relationships = match &payload.reference {
            Some(reference) => self.lineage.resolve_reference(reference).await?,
            None => Vec::new(),
        };

        let subject_id = self.subject_id(actor).await?;

        let schema = self.schema.get(&self.lineage).await?;
        let mut fields = payload.fields;
        if let Some(id) = subject_id {
            fields.insert("id".to_string(), Value::String(id));
        }
        let subject = self.lineage.build_subject(Some(schema), fields)?;
        self.lineage.verify_subject(schema, &subject).await?;

        let envelope = self.lineage.create_document(subject).await?;
        let mut accounts = BTreeMap::new();
        if let Some(account) = &actor.account_id {
            accounts.insert(DEFAULT_ACCOUNT.to_string(), account.clone());
        }
        let metadata = RecordMetadata {
            owner: actor.did.clone().unwrap_or_default(),
            doc_type: self
                .options
                .entity_type
                .clone()
                .unwrap_or_else(|| schema.name.clone()),
            tag: self.block.tag.clone(),
            schema: Some(schema.iri.clone()),
            accounts,
        };
        let record = self.lineage.draft(&envelope, relationships, metadata);

        for validator in &self.validators {
            let reasons = validator.check(&record);
            if !reasons.is_empty() {
                return Ok(Produced::Rejected(Rejection {
                    block_id: validator.block().id.clone(),
                    kind: ActionErrorKind::DocumentInvalid,
                    reasons,
                }));
            }
        }
        Ok(Produced::Document(record))
    }

    async fn subject_id(&self, actor: &Actor) -> RequestResult<Option<String>> {
        Ok(match self.options.id_type {
            IdType::Uuid => Some(Uuid::new_v4().to_string()),
            IdType::Owner => actor.did.clone(),
            IdType::None => None,
            IdType::Did => {
                let topic = self
                    .lineage
                    .topic_for(TopicKind::Root, actor, &self.block)
                    .await?;
                let metadata = RecordMetadata {
                    owner: actor.did.clone().unwrap_or_default(),
                    doc_type: "did".to_string(),
                    tag: self.block.tag.clone(),
                    ..RecordMetadata::default()
                };
                Some(self.lineage.issue_did(actor, &topic, metadata).await?)
            }
        })
    }
}
