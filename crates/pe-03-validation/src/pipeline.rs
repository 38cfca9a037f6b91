//! # Validation Pipeline
//!
//! Runs at publish time, never at runtime. Every block instance is checked
//! by the validators common to all blocks plus the ones registered for its
//! block type; all errors are aggregated, nothing is fail-fast.
//!
//! A validator that returns `Err` or panics does not abort the run: the
//! block gets one generic error and the walk continues.

use crate::ports::ReferenceResolver;
use crate::results::ValidationResults;
use crate::validator::{BlockValidator, EventLinkValidator, PlacementValidator, ValidationContext};
use futures::FutureExt;
use pe_01_block_tree::{BlockInstance, BlockTree};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Recorded in place of whatever a broken validator would have reported.
pub const UNHANDLED_VALIDATION_ERROR: &str = "Unhandled exception during block validation";

/// Validators per block type plus the common ones.
#[derive(Clone)]
pub struct ValidationPipeline {
    common: Vec<Arc<dyn BlockValidator>>,
    by_type: HashMap<String, Vec<Arc<dyn BlockValidator>>>,
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationPipeline {
    /// Pipeline with the event link and placement validators installed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            common: vec![Arc::new(EventLinkValidator), Arc::new(PlacementValidator)],
            by_type: HashMap::new(),
        }
    }

    /// Pipeline with no validators at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            common: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Add a validator for one block type.
    pub fn register(&mut self, block_type: impl Into<String>, validator: Arc<dyn BlockValidator>) {
        self.by_type
            .entry(block_type.into())
            .or_default()
            .push(validator);
    }

    /// Add a validator run for every block.
    pub fn register_common(&mut self, validator: Arc<dyn BlockValidator>) {
        self.common.push(validator);
    }

    /// Validate a whole compiled policy.
    #[instrument(skip_all, fields(policy_id = %tree.policy_id(), blocks = tree.len()))]
    pub async fn validate_policy(
        &self,
        tree: &BlockTree,
        references: &dyn ReferenceResolver,
    ) -> ValidationResults {
        let routes = tree.resolve_routes();
        let ctx = ValidationContext {
            tree,
            routes: &routes,
            references,
        };

        let mut results = ValidationResults::new();
        for instance in tree.iter() {
            self.validate(instance, &ctx, &mut results).await;
        }

        info!(
            valid = results.is_valid(),
            errors = results.error_count(),
            "Policy validation finished"
        );
        results
    }

    /// Validate one block instance, appending its errors to `results`.
    pub async fn validate(
        &self,
        instance: &BlockInstance,
        ctx: &ValidationContext<'_>,
        results: &mut ValidationResults,
    ) {
        let specific = self
            .by_type
            .get(&instance.block_type)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut errors = Vec::new();
        let mut faulted = false;
        for validator in self.common.iter().chain(specific) {
            let outcome = AssertUnwindSafe(validator.validate(instance, ctx))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(found)) => errors.extend(found),
                Ok(Err(err)) => {
                    warn!(block_id = %instance.id, block_type = %instance.block_type, error = %err, "Validator failed");
                    faulted = true;
                }
                Err(_) => {
                    warn!(block_id = %instance.id, block_type = %instance.block_type, "Validator panicked");
                    faulted = true;
                }
            }
        }

        if faulted {
            errors.push(UNHANDLED_VALIDATION_ERROR.to_string());
        }
        if !errors.is_empty() {
            debug!(block_id = %instance.id, count = errors.len(), "Block has configuration errors");
        }
        results.extend(&instance.id, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AcceptAllReferences, ReferenceKind};
    use crate::rules::{OptionRule, RuleSet};
    use async_trait::async_trait;
    use pe_01_block_tree::{BlockConfig, BlockRegistry, EventLink, PolicyConfig};
    use serde::Deserialize;
    use serde_json::json;
    use shared_types::{
        BlockDescriptor, BlockId, ChildrenPolicy, CollaboratorError, EventType, PolicyId,
    };

    #[derive(Deserialize)]
    #[allow(dead_code)]
    #[serde(rename_all = "camelCase")]
    struct TokenOptions {
        token_id: String,
        #[serde(default)]
        decimals: Option<u32>,
    }

    struct KnownReferences;

    #[async_trait]
    impl ReferenceResolver for KnownReferences {
        async fn exists(&self, kind: ReferenceKind, id: &str) -> Result<bool, CollaboratorError> {
            match kind {
                ReferenceKind::Token => Ok(id == "0.0.42"),
                ReferenceKind::Schema => Err(CollaboratorError::Storage("offline".into())),
            }
        }
    }

    struct Panicking;

    #[async_trait]
    impl BlockValidator for Panicking {
        async fn validate(
            &self,
            _instance: &BlockInstance,
            _ctx: &ValidationContext<'_>,
        ) -> anyhow::Result<Vec<String>> {
            panic!("validator bug")
        }
    }

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry
            .register(BlockDescriptor::new("container").children(ChildrenPolicy::Any))
            .unwrap();
        registry
            .register(
                BlockDescriptor::new("mint")
                    .event()
                    .inputs([EventType::RunEvent])
                    .outputs([EventType::RunEvent]),
            )
            .unwrap();
        registry
            .register(BlockDescriptor::new("schemaBound"))
            .unwrap();
        registry
            .register(BlockDescriptor::new("broken"))
            .unwrap();
        registry
            .register(BlockDescriptor::new("check").validator())
            .unwrap();
        registry
    }

    fn pipeline() -> ValidationPipeline {
        let mut pipeline = ValidationPipeline::new();
        pipeline.register(
            "mint",
            Arc::new(
                RuleSet::typed::<TokenOptions>()
                    .rule(OptionRule::Required("tokenId"))
                    .rule(OptionRule::ResolvesTo("tokenId", ReferenceKind::Token))
                    .rule(OptionRule::OneOf("accountType", &["default", "custom"]))
                    .rule(OptionRule::Numeric("decimals")),
            ),
        );
        pipeline.register(
            "schemaBound",
            Arc::new(RuleSet::new().rule(OptionRule::ResolvesTo("schema", ReferenceKind::Schema))),
        );
        pipeline.register("broken", Arc::new(Panicking));
        pipeline
    }

    fn compile(root: BlockConfig) -> BlockTree {
        let policy = PolicyConfig {
            id: PolicyId::new("p"),
            name: String::new(),
            topic_id: None,
            root,
        };
        BlockTree::compile(&policy, &registry()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_policy() {
        let tree = compile(
            BlockConfig::new("container", "root").with_child(
                BlockConfig::new("mint", "mint")
                    .with_options(json!({ "tokenId": "0.0.42", "accountType": "default" })),
            ),
        );

        let results = pipeline().validate_policy(&tree, &KnownReferences).await;
        assert!(results.is_valid(), "{results:?}");
    }

    #[tokio::test]
    async fn test_every_misconfigured_block_is_reported() {
        let tree = compile(
            BlockConfig::new("container", "root")
                .with_child(
                    BlockConfig::new("mint", "no_token")
                        .with_id("m1")
                        .with_options(json!({ "accountType": "other" })),
                )
                .with_child(
                    BlockConfig::new("mint", "unknown_token")
                        .with_id("m2")
                        .with_options(json!({ "tokenId": "0.0.7", "decimals": "x" })),
                )
                .with_child(
                    BlockConfig::new("mint", "bad_link")
                        .with_id("m3")
                        .with_options(json!({ "tokenId": "0.0.42" }))
                        .with_link(EventLink::new(EventType::RunEvent, "ghost", EventType::RunEvent)),
                ),
        );

        let results = pipeline().validate_policy(&tree, &KnownReferences).await;

        let m1 = results.errors_for(&BlockId::new("m1"));
        assert!(m1.iter().any(|e| e.starts_with("Invalid options")));
        assert!(m1.iter().any(|e| e.contains("\"tokenId\" is not set")));
        assert!(m1.iter().any(|e| e.contains("must be one of")));

        let m2 = results.errors_for(&BlockId::new("m2"));
        assert!(m2.iter().any(|e| e.contains("token \"0.0.7\"")));
        assert!(m2.iter().any(|e| e.contains("must be numeric")));

        assert_eq!(results.errors_for(&BlockId::new("m3")).len(), 1);
        assert_eq!(results.invalid_blocks().count(), 3);
    }

    #[tokio::test]
    async fn test_faults_become_one_generic_error() {
        let tree = compile(
            BlockConfig::new("container", "root")
                .with_child(BlockConfig::new("broken", "broken").with_id("b"))
                .with_child(
                    BlockConfig::new("schemaBound", "schema")
                        .with_id("s")
                        .with_options(json!({ "schema": "#x" })),
                )
                .with_child(BlockConfig::new("container", "fine").with_id("ok")),
        );

        let results = pipeline().validate_policy(&tree, &KnownReferences).await;

        assert_eq!(
            results.errors_for(&BlockId::new("b")),
            [UNHANDLED_VALIDATION_ERROR.to_string()]
        );
        assert_eq!(
            results.errors_for(&BlockId::new("s")),
            [UNHANDLED_VALIDATION_ERROR.to_string()]
        );
        assert!(results.errors_for(&BlockId::new("ok")).is_empty());
    }

    #[tokio::test]
    async fn test_validator_at_root_is_flagged() {
        let tree = compile(BlockConfig::new("check", "lonely").with_id("v"));
        let results = ValidationPipeline::new()
            .validate_policy(&tree, &AcceptAllReferences)
            .await;
        assert_eq!(results.errors_for(&BlockId::new("v")).len(), 1);
    }
}
