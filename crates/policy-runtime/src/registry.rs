//! # Built-in Block Types
//!
//! ```text
//! ┌──────────────────────────┬────────────────────────────────────────────┐
//! │ interfaceContainerBlock  │ groups blocks, any children                │
//! │ requestVcDocumentBlock   │ actor action, per-actor state, validators  │
//! │ documentValidatorBlock   │ checks its parent's documents              │
//! │ sendToLedgerBlock        │ Run → submit → Run, Refresh                │
//! │ mintDocumentBlock        │ Run → VC, VP, mint → Run, Refresh          │
//! └──────────────────────────┴────────────────────────────────────────────┘
//! ```
//!
//! The registry is built once per process and shared read-only.

use pe_01_block_tree::BlockRegistry;
use pe_03_validation::ValidationPipeline;
use pe_04_document_lineage::blocks::send_to_ledger;
use pe_05_request_block::{request, validator_block};
use pe_06_mint_block::{mint, options as mint_options};
use shared_types::{BlockDescriptor, ChildrenPolicy, ControlKind};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

pub const INTERFACE_CONTAINER_BLOCK: &str = "interfaceContainerBlock";

static BUILTIN: OnceLock<Arc<BlockRegistry>> = OnceLock::new();

fn container_descriptor() -> BlockDescriptor {
    BlockDescriptor::new(INTERFACE_CONTAINER_BLOCK)
        .children(ChildrenPolicy::Any)
        .control(ControlKind::Ui)
        .describe("Groups blocks; its children run in order")
}

/// Descriptors of every built-in block type.
pub fn builtin_descriptors() -> Vec<BlockDescriptor> {
    vec![
        container_descriptor(),
        request::descriptor(),
        validator_block::descriptor(),
        send_to_ledger::descriptor(),
        mint::descriptor(),
    ]
}

/// The process-wide registry of built-in block types.
pub fn builtin() -> Arc<BlockRegistry> {
    BUILTIN
        .get_or_init(|| {
            let mut registry = BlockRegistry::new();
            for descriptor in builtin_descriptors() {
                if let Err(err) = registry.register(descriptor) {
                    error!(error = %err, "Built-in block type skipped");
                }
            }
            info!(block_types = registry.len(), "Block registry installed");
            registry.freeze()
        })
        .clone()
}

/// Validation pipeline with the option rules of every built-in block type.
pub fn builtin_pipeline() -> ValidationPipeline {
    let mut pipeline = ValidationPipeline::new();
    pipeline.register(request::REQUEST_BLOCK, Arc::new(pe_05_request_block::options::rules()));
    pipeline.register(
        validator_block::DOCUMENT_VALIDATOR_BLOCK,
        Arc::new(validator_block::rules()),
    );
    pipeline.register(
        send_to_ledger::SEND_TO_LEDGER_BLOCK,
        Arc::new(send_to_ledger::rules()),
    );
    pipeline.register(mint::MINT_BLOCK, Arc::new(mint_options::rules()));
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::EventType;

    #[test]
    fn test_builtin_registry() {
        let registry = builtin();
        assert_eq!(
            registry.block_types(),
            vec![
                validator_block::DOCUMENT_VALIDATOR_BLOCK,
                INTERFACE_CONTAINER_BLOCK,
                mint::MINT_BLOCK,
                request::REQUEST_BLOCK,
                send_to_ledger::SEND_TO_LEDGER_BLOCK,
            ]
        );
        assert!(Arc::ptr_eq(&registry, &builtin()));
    }

    #[test]
    fn test_builtin_contracts() {
        let registry = builtin();
        let request = registry.describe(request::REQUEST_BLOCK).unwrap();
        assert!(request.capabilities.is_action && request.capabilities.has_state);
        assert!(request.allows_child(validator_block::DOCUMENT_VALIDATOR_BLOCK));
        assert!(!request.allows_child(mint::MINT_BLOCK));

        let mint = registry.describe(mint::MINT_BLOCK).unwrap();
        assert!(mint.accepts(EventType::RunEvent));
        assert!(mint.capabilities.publishes_external_event);

        let container = registry.describe(INTERFACE_CONTAINER_BLOCK).unwrap();
        assert!(container.allows_child(mint::MINT_BLOCK));
    }
}
