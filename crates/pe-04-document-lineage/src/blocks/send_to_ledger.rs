//! # Send-to-Ledger Block
//!
//! On RunEvent, submits every incoming document that is not on the ledger
//! yet, persists it with its relationships and passes the submitted
//! documents on. Documents that already carry a message id go through
//! unchanged.

use crate::domain::DocumentLineage;
use crate::ports::TopicKind;
use async_trait::async_trait;
use pe_01_block_tree::BlockInstance;
use pe_03_validation::{OptionRule, RuleSet};
use serde::Deserialize;
use shared_bus::{BlockEventHandler, Dispatcher, Handled};
use shared_types::{
    ActionErrorKind, Actor, BlockActionError, BlockDescriptor, BlockRef, ControlKind,
    DocumentRecord, EventState, EventType, PolicyEvent,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const SEND_TO_LEDGER_BLOCK: &str = "sendToLedgerBlock";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToLedgerOptions {
    /// Where documents go when no explicit topic id is set.
    #[serde(default)]
    pub topic: TopicKind,
    /// Explicit topic, overrides `topic`.
    #[serde(default)]
    pub topic_id: Option<String>,
}

pub fn descriptor() -> BlockDescriptor {
    BlockDescriptor::new(SEND_TO_LEDGER_BLOCK)
        .event()
        .external_events()
        .default_event()
        .inputs([EventType::RunEvent])
        .outputs([EventType::RunEvent, EventType::RefreshEvent])
        .control(ControlKind::Server)
        .describe("Submits incoming documents to the ledger and persists them")
}

pub fn rules() -> RuleSet {
    RuleSet::typed::<SendToLedgerOptions>()
        .rule(OptionRule::OneOf("topic", &["root", "block", "user"]))
        .rule(OptionRule::NonEmptyString("topicId"))
}

pub struct SendToLedgerBlock {
    block: BlockRef,
    options: SendToLedgerOptions,
    lineage: Arc<DocumentLineage>,
}

impl SendToLedgerBlock {
    pub fn from_instance(
        instance: &BlockInstance,
        lineage: Arc<DocumentLineage>,
    ) -> Result<Self, BlockActionError> {
        let block = instance.block_ref();
        let options = serde_json::from_value(instance.options.clone()).map_err(|e| {
            BlockActionError::new(&block, ActionErrorKind::Configuration, e.to_string())
        })?;
        Ok(Self {
            block,
            options,
            lineage,
        })
    }

    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    /// Submit the documents that are not on the ledger yet.
    #[instrument(skip_all, fields(block_id = %self.block.id, actor = %actor.state_key(), documents = documents.len()))]
    pub async fn send(
        &self,
        actor: &Actor,
        documents: Vec<DocumentRecord>,
    ) -> Result<Vec<DocumentRecord>, BlockActionError> {
        if documents.is_empty() {
            return Err(BlockActionError::new(
                &self.block,
                ActionErrorKind::BadDocument,
                "no documents to send",
            ));
        }

        let topic = match &self.options.topic_id {
            Some(id) => self.lineage.topic_by_id(id, &self.block).await,
            None => self.lineage.topic_for(self.options.topic, actor, &self.block).await,
        }
        .map_err(|e| e.into_action_error(&self.block))?;

        let mut submitted = Vec::with_capacity(documents.len());
        for record in documents {
            if record.is_submitted() {
                debug!(document_id = %record.id, "Already on the ledger, passing through");
                submitted.push(record);
                continue;
            }
            let document = self
                .lineage
                .submit_record(&topic, record)
                .await
                .map_err(|e| e.into_action_error(&self.block))?;
            info!(message_id = %document.message_id(), "Document submitted");
            submitted.push(document.into_record());
        }
        Ok(submitted)
    }
}

#[async_trait]
impl BlockEventHandler for SendToLedgerBlock {
    async fn on_event(
        &self,
        event: PolicyEvent,
        dispatcher: &Dispatcher,
    ) -> Result<Handled, BlockActionError> {
        let submitted = self.send(&event.actor, event.payload.documents).await?;

        let mut report = dispatcher
            .trigger(
                &self.block.id,
                EventType::RunEvent,
                &event.actor,
                EventState::with_documents(submitted),
            )
            .await;
        report.merge(
            dispatcher
                .trigger(&self.block.id, EventType::RefreshEvent, &event.actor, EventState::empty())
                .await,
        );
        Ok(report.into())
    }
}
