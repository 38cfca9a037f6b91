//! # Block Wiring
//!
//! Turns a compiled block tree into live block implementations connected
//! through one dispatcher.
//!
//! ```text
//!   BlockTree ──iter()──────────→ RoutingTable.add_block
//!       │    ──resolve_routes()─→ RoutingTable.add_route
//!       │
//!       ├── requestVcDocumentBlock  → RequestBlock (+ validator descendants)
//!       ├── sendToLedgerBlock       → Dispatcher.register_handler
//!       └── mintDocumentBlock       → Dispatcher.register_handler
//! ```

use crate::errors::{EngineError, EngineResult};
use pe_01_block_tree::BlockTree;
use pe_02_actor_state::ActorStateStore;
use pe_04_document_lineage::blocks::send_to_ledger::{SendToLedgerBlock, SEND_TO_LEDGER_BLOCK};
use pe_04_document_lineage::DocumentLineage;
use pe_05_request_block::{DocumentValidatorBlock, RequestBlock, REQUEST_BLOCK};
use pe_06_mint_block::{MintBlock, MINT_BLOCK};
use shared_bus::{Dispatcher, ObserverBus, RoutingTable};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Live blocks of one published policy.
pub struct Wiring {
    pub dispatcher: Arc<Dispatcher>,
    /// Action blocks by tag.
    pub actions: HashMap<String, Arc<RequestBlock>>,
}

/// Routing table with every instance and every resolved route of `tree`.
pub fn routing_table(tree: &BlockTree) -> RoutingTable {
    let mut table = RoutingTable::new();
    for instance in tree.iter() {
        table.add_block(instance.id.clone(), instance.descriptor.clone());
    }
    for route in tree.resolve_routes().routes {
        table.add_route(route);
    }
    table
}

/// Instantiate the blocks of `tree` and connect them.
pub fn wire(
    tree: &BlockTree,
    lineage: Arc<DocumentLineage>,
    state: ActorStateStore,
    event_capacity: usize,
) -> EngineResult<Wiring> {
    let table = routing_table(tree);
    let routes = table.route_count();
    let dispatcher = Arc::new(Dispatcher::new(
        table,
        Arc::new(ObserverBus::with_capacity(event_capacity)),
    ));

    let mut actions = HashMap::new();
    for instance in tree.iter() {
        match instance.block_type.as_str() {
            REQUEST_BLOCK => {
                let validators = tree
                    .find_children_by_capability(instance.index(), |c| c.is_validator)
                    .map(|child| DocumentValidatorBlock::from_instance(child).map(Arc::new))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(EngineError::Wiring)?;
                let block = RequestBlock::from_instance(
                    instance,
                    lineage.clone(),
                    state.clone(),
                    validators,
                )
                .map_err(EngineError::Wiring)?;
                actions.insert(instance.tag.clone(), Arc::new(block));
            }
            SEND_TO_LEDGER_BLOCK => {
                let block = SendToLedgerBlock::from_instance(instance, lineage.clone())
                    .map_err(EngineError::Wiring)?;
                dispatcher.register_handler(instance.id.clone(), Arc::new(block));
            }
            MINT_BLOCK => {
                let block = MintBlock::from_instance(instance, lineage.clone())
                    .map_err(EngineError::Wiring)?;
                dispatcher.register_handler(instance.id.clone(), Arc::new(block));
            }
            other => debug!(block_type = other, tag = %instance.tag, "No runtime behaviour"),
        }
    }

    info!(
        policy_id = %tree.policy_id(),
        blocks = tree.len(),
        routes,
        actions = actions.len(),
        "Policy wired"
    );
    Ok(Wiring {
        dispatcher,
        actions,
    })
}
