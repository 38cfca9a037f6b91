//! # Policy Engine
//!
//! Facade over the block engine: publishes policies and runs actor actions
//! against them.
//!
//! ```text
//! publish(PolicyConfig)
//!   ├── BlockTree::compile        (built-in registry)
//!   ├── ValidationPipeline        (every block, errors aggregated)
//!   │     └── strict and invalid → EngineError::InvalidPolicy
//!   └── wire                      → PublishedPolicy
//!
//! PublishedPolicy::set_data(tag, actor, payload)
//!   └── timeout(action_timeout, RequestBlock::set_data → dispatch cascade)
//! ```

use crate::adapters::MeteredLedger;
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::registry::{builtin, builtin_pipeline};
use crate::wiring::wire;
use pe_01_block_tree::{BlockRegistry, BlockTree, PolicyConfig};
use pe_02_actor_state::ActorStateStore;
use pe_03_validation::{ValidationPipeline, ValidationResults};
use pe_04_document_lineage::{Collaborators, DocumentLineage, RepositoryReferences};
use pe_05_request_block::{RequestBlock, RequestOutcome, RequestPayload};
use policy_telemetry::{
    log_block_event, register_metrics, ActionTimer, MetricsHandle, ACTIONS, EVENTS_DISPATCHED,
    VALIDATION_ERRORS,
};
use serde_json::Value;
use shared_bus::{DeliveryStatus, DispatchReport, Dispatcher, EventFilter, Subscription};
use shared_types::{Actor, RootAuthority};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// =============================================================================
// ENGINE
// =============================================================================

pub struct PolicyEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    root: RootAuthority,
    registry: Arc<BlockRegistry>,
    pipeline: ValidationPipeline,
    metrics: MetricsHandle,
}

impl PolicyEngine {
    /// Create an engine over the given collaborators.
    ///
    /// The ledger is wrapped so submissions and mints are counted.
    pub fn new(
        config: EngineConfig,
        mut collaborators: Collaborators,
        root: RootAuthority,
    ) -> EngineResult<Self> {
        let metrics = register_metrics()?;
        collaborators.ledger = Arc::new(MeteredLedger::new(collaborators.ledger));
        info!(
            action_timeout_ms = config.action_timeout.as_millis() as u64,
            strict_publish = config.strict_publish,
            "Policy engine created"
        );
        Ok(Self {
            config,
            collaborators,
            root,
            registry: builtin(),
            pipeline: builtin_pipeline(),
            metrics,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Compile, validate and wire a policy.
    #[instrument(skip_all, fields(policy_id = %policy.id))]
    pub async fn publish(&self, policy: PolicyConfig) -> EngineResult<PublishedPolicy> {
        let tree = BlockTree::compile(&policy, &self.registry)?;

        let references = RepositoryReferences::new(self.collaborators.repository.clone());
        let validation = self.pipeline.validate_policy(&tree, &references).await;
        #[allow(clippy::cast_precision_loss)]
        VALIDATION_ERRORS.inc_by(validation.error_count() as f64);

        if !validation.is_valid() {
            if self.config.strict_publish {
                warn!(errors = validation.error_count(), "Policy refused");
                return Err(EngineError::InvalidPolicy {
                    results: validation,
                });
            }
            warn!(
                errors = validation.error_count(),
                "Publishing a policy that failed validation"
            );
        }

        let lineage = Arc::new(DocumentLineage::new(
            self.collaborators.clone(),
            self.root.clone(),
            tree.policy_id().clone(),
        ));
        let state = ActorStateStore::new();
        let wiring = wire(&tree, lineage, state.clone(), self.config.event_capacity)?;

        info!(blocks = tree.len(), "Policy published");
        Ok(PublishedPolicy {
            tree: Arc::new(tree),
            validation,
            dispatcher: wiring.dispatcher,
            actions: wiring.actions,
            state,
            config: self.config.clone(),
        })
    }

    /// Parse a JSON policy definition and publish it.
    pub async fn publish_json(&self, json: &str) -> EngineResult<PublishedPolicy> {
        self.publish(PolicyConfig::from_json(json)?).await
    }
}

// =============================================================================
// PUBLISHED POLICY
// =============================================================================

/// A compiled, validated and wired policy. Cheap to share behind an `Arc`.
pub struct PublishedPolicy {
    tree: Arc<BlockTree>,
    validation: ValidationResults,
    dispatcher: Arc<Dispatcher>,
    actions: HashMap<String, Arc<RequestBlock>>,
    state: ActorStateStore,
    config: EngineConfig,
}

impl PublishedPolicy {
    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    /// Validation results recorded at publish time.
    pub fn validation(&self) -> &ValidationResults {
        &self.validation
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Tags of the blocks that accept actor data, sorted.
    pub fn action_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Observe every event the policy's blocks trigger.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.dispatcher.observers().subscribe(filter)
    }

    /// Per-actor state of the block tagged `tag`.
    pub fn state_of(&self, tag: &str, actor: &Actor) -> EngineResult<Value> {
        let instance = self
            .tree
            .resolve_tag(tag)
            .map_err(|_| EngineError::UnknownBlock(tag.to_string()))?;
        Ok(self.state.get(&instance.id, actor))
    }

    /// Submit `payload` to the action block tagged `tag` on behalf of `actor`.
    ///
    /// The whole action, downstream deliveries included, runs under the
    /// configured deadline. A timed-out action leaves the block available
    /// again for the actor.
    #[instrument(skip_all, fields(tag = %tag, actor = %actor.state_key()))]
    pub async fn set_data(
        &self,
        tag: &str,
        actor: &Actor,
        payload: RequestPayload,
    ) -> EngineResult<RequestOutcome> {
        let block = self.action_block(tag)?;
        let block_type = block.block().block_type.clone();
        let _timer = ActionTimer::start(&block_type);

        let result = tokio::time::timeout(
            self.config.action_timeout,
            block.set_data(actor, payload, &self.dispatcher),
        )
        .await;

        let outcome = match result {
            Err(_) => {
                ACTIONS.with_label_values(&[block_type.as_str(), "timeout"]).inc();
                log_block_event!(warn, block_type, block.block().id, "Action timed out");
                return Err(EngineError::Timeout {
                    tag: tag.to_string(),
                    after: self.config.action_timeout,
                });
            }
            Ok(Err(err)) => {
                ACTIONS.with_label_values(&[block_type.as_str(), "failed"]).inc();
                log_block_event!(warn, block_type, block.block().id, "Action failed", error = %err);
                return Err(EngineError::Action(err));
            }
            Ok(Ok(outcome)) => outcome,
        };

        match &outcome {
            RequestOutcome::Accepted { report, .. } => {
                ACTIONS.with_label_values(&[block_type.as_str(), "accepted"]).inc();
                record_deliveries(report);
                log_block_event!(
                    info,
                    block_type,
                    block.block().id,
                    "Action accepted",
                    deliveries = report.deliveries.len(),
                    failures = report.failures().count()
                );
            }
            RequestOutcome::Rejected(rejection) => {
                ACTIONS.with_label_values(&[block_type.as_str(), "rejected"]).inc();
                log_block_event!(
                    info,
                    block_type,
                    block.block().id,
                    "Action rejected",
                    validator = %rejection.block_id
                );
            }
        }
        Ok(outcome)
    }

    fn action_block(&self, tag: &str) -> EngineResult<&Arc<RequestBlock>> {
        if let Some(block) = self.actions.get(tag) {
            return Ok(block);
        }
        let instance = self
            .tree
            .resolve_tag(tag)
            .map_err(|_| EngineError::UnknownBlock(tag.to_string()))?;
        Err(EngineError::NotAnActionBlock {
            tag: tag.to_string(),
            block_type: instance.block_type.clone(),
        })
    }
}

fn status_label(status: &DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "pending",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Completed => "completed",
        DeliveryStatus::Failed(_) => "failed",
        DeliveryStatus::Undeliverable(_) => "undeliverable",
    }
}

fn record_deliveries(report: &DispatchReport) {
    for delivery in &report.deliveries {
        EVENTS_DISPATCHED
            .with_label_values(&[delivery.event_type.as_str(), status_label(&delivery.status)])
            .inc();
    }
}
