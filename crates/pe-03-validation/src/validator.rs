//! Validator contract and the validators every block gets.

use crate::ports::ReferenceResolver;
use async_trait::async_trait;
use pe_01_block_tree::{BlockInstance, BlockTree, RouteResolution};

/// Everything a validator may consult.
pub struct ValidationContext<'a> {
    pub tree: &'a BlockTree,
    pub routes: &'a RouteResolution,
    pub references: &'a dyn ReferenceResolver,
}

/// Publish-time configuration check of one block instance.
///
/// Returns the configuration errors found. An `Err` means the validator
/// itself broke; the pipeline records it as a single generic error.
#[async_trait]
pub trait BlockValidator: Send + Sync {
    async fn validate(
        &self,
        instance: &BlockInstance,
        ctx: &ValidationContext<'_>,
    ) -> anyhow::Result<Vec<String>>;
}

/// Reports event links that could not be routed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLinkValidator;

#[async_trait]
impl BlockValidator for EventLinkValidator {
    async fn validate(
        &self,
        instance: &BlockInstance,
        ctx: &ValidationContext<'_>,
    ) -> anyhow::Result<Vec<String>> {
        Ok(ctx
            .routes
            .problems_for(&instance.id)
            .map(str::to_string)
            .collect())
    }
}

/// Flags validator blocks placed at the root, where there is no parent
/// document to check.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementValidator;

#[async_trait]
impl BlockValidator for PlacementValidator {
    async fn validate(
        &self,
        instance: &BlockInstance,
        ctx: &ValidationContext<'_>,
    ) -> anyhow::Result<Vec<String>> {
        let mut errors = Vec::new();
        if instance.capabilities().is_validator && ctx.tree.parent(instance).is_none() {
            errors.push(format!(
                "{} cannot be the root block",
                instance.block_type
            ));
        }
        Ok(errors)
    }
}
