//! # Block Event Dispatcher
//!
//! Delivers events triggered by one block instance to the instances wired to
//! it.
//!
//! ## Delivery model
//!
//! ```text
//! trigger(source, output)
//!     │
//!     ├── cascade already MAX_CASCADE_DEPTH deep ──→ Undeliverable
//!     ├── source does not declare output ──→ Undeliverable (nothing sent)
//!     ├── publish to observers (ObserverBus)
//!     └── for each route (declaration order)
//!             Pending ──→ Delivered ──→ Completed
//!                │             └──────→ Failed(reason)
//!                └── target does not accept input ──→ Undeliverable
//! ```
//!
//! - A failing handler only ends its own branch. Sibling routes still run and
//!   nothing already delivered is rolled back.
//! - There is no redelivery.
//! - Event cycles are refused when a policy is published. A cascade that
//!   still loops stops at [`MAX_CASCADE_DEPTH`] nested deliveries.
//! - Warnings a handler returns are attached to its delivery record.
//! - Handlers are awaited one after the other, so the events a handler
//!   triggers reach their targets in the order it triggered them.
//! - The routing table is immutable after construction. The handler map is
//!   only locked long enough to clone an `Arc`, never across an await.

use crate::observers::ObserverBus;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{
    Actor, BlockActionError, BlockDescriptor, BlockId, EventRoute, EventState, EventType,
    PolicyEvent,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Receives events addressed to one block instance.
#[async_trait]
pub trait BlockEventHandler: Send + Sync {
    /// Handle a delivered event.
    ///
    /// Events the handler triggers through `dispatcher` are returned so that
    /// the caller's report covers the whole cascade.
    async fn on_event(
        &self,
        event: PolicyEvent,
        dispatcher: &Dispatcher,
    ) -> Result<Handled, BlockActionError>;
}

/// What a handler produced for one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handled {
    /// Deliveries the handler triggered.
    pub report: DispatchReport,
    /// Non-fatal anomalies noticed while handling.
    pub warnings: Vec<String>,
}

impl Handled {
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

impl From<DispatchReport> for Handled {
    fn from(report: DispatchReport) -> Self {
        Self {
            report,
            warnings: Vec::new(),
        }
    }
}

// =============================================================================
// ROUTING TABLE
// =============================================================================

/// Descriptors of the block instances and the resolved routes between them.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    blocks: HashMap<BlockId, Arc<BlockDescriptor>>,
    routes: HashMap<(BlockId, EventType), Vec<EventRoute>>,
    route_count: usize,
}

impl RoutingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a block instance and its type descriptor.
    pub fn add_block(&mut self, id: BlockId, descriptor: Arc<BlockDescriptor>) {
        self.blocks.insert(id, descriptor);
    }

    /// Append a route. Routes from the same output keep insertion order.
    pub fn add_route(&mut self, route: EventRoute) {
        self.routes
            .entry((route.source.clone(), route.output))
            .or_default()
            .push(route);
        self.route_count += 1;
    }

    pub fn descriptor(&self, id: &BlockId) -> Option<&BlockDescriptor> {
        self.blocks.get(id).map(Arc::as_ref)
    }

    /// Routes leaving `source` for `output`, in declaration order.
    pub fn routes_from(&self, source: &BlockId, output: EventType) -> &[EventRoute] {
        self.routes
            .get(&(source.clone(), output))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }
}

// =============================================================================
// DELIVERY REPORTS
// =============================================================================

/// State of one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "reason")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Completed,
    Failed(String),
    /// Refused before reaching a handler.
    Undeliverable(String),
}

/// Outcome of delivering one event to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    /// Event type as received by the target.
    pub event_type: EventType,
    pub source: BlockId,
    pub target: Option<BlockId>,
    pub actor: String,
    pub status: DeliveryStatus,
    /// Warnings returned by the target's handler.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DeliveryRecord {
    fn pending(route: &EventRoute, actor: &Actor) -> Self {
        Self {
            event_type: route.input,
            source: route.source.clone(),
            target: Some(route.target.clone()),
            actor: actor.state_key(),
            status: DeliveryStatus::Pending,
            warnings: Vec::new(),
        }
    }

    fn refused(source: &BlockId, event_type: EventType, actor: &Actor, reason: String) -> Self {
        Self {
            event_type,
            source: source.clone(),
            target: None,
            actor: actor.state_key(),
            status: DeliveryStatus::Undeliverable(reason),
            warnings: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == DeliveryStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, DeliveryStatus::Failed(_))
    }
}

/// Every delivery caused by one trigger, nested cascades included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub deliveries: Vec<DeliveryRecord>,
}

impl DispatchReport {
    pub fn push(&mut self, record: DeliveryRecord) {
        self.deliveries.push(record);
    }

    /// Append the deliveries of another report.
    pub fn merge(&mut self, other: DispatchReport) {
        self.deliveries.extend(other.deliveries);
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.deliveries.iter().filter(|d| d.is_completed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeliveryRecord> {
        self.deliveries.iter().filter(|d| d.is_failed())
    }

    pub fn undeliverable(&self) -> impl Iterator<Item = &DeliveryRecord> {
        self.deliveries
            .iter()
            .filter(|d| matches!(d.status, DeliveryStatus::Undeliverable(_)))
    }

    /// Warnings raised by every handler in the cascade, in delivery order.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.deliveries
            .iter()
            .flat_map(|d| d.warnings.iter().map(String::as_str))
    }

    /// Deliveries that reached `target`.
    pub fn delivered_to<'a>(
        &'a self,
        target: &'a BlockId,
    ) -> impl Iterator<Item = &'a DeliveryRecord> + 'a {
        self.deliveries
            .iter()
            .filter(move |d| d.target.as_ref() == Some(target))
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Longest chain of nested deliveries one trigger may start.
pub const MAX_CASCADE_DEPTH: usize = 64;

tokio::task_local! {
    static CASCADE_DEPTH: usize;
}

/// Routes events between block instances of one policy.
pub struct Dispatcher {
    table: RoutingTable,
    handlers: RwLock<HashMap<BlockId, Arc<dyn BlockEventHandler>>>,
    observers: Arc<ObserverBus>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RoutingTable, observers: Arc<ObserverBus>) -> Self {
        Self {
            table,
            handlers: RwLock::new(HashMap::new()),
            observers,
        }
    }

    /// Install the handler for a block instance, replacing any previous one.
    pub fn register_handler(&self, block: BlockId, handler: Arc<dyn BlockEventHandler>) {
        self.handlers.write().insert(block, handler);
    }

    pub fn has_handler(&self, block: &BlockId) -> bool {
        self.handlers.read().contains_key(block)
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.table
    }

    pub fn observers(&self) -> &Arc<ObserverBus> {
        &self.observers
    }

    /// Trigger `output` on behalf of `source` and deliver it to every wired
    /// receiver.
    #[instrument(
        skip_all,
        fields(block_id = %source, event_type = %output, actor = %actor.state_key())
    )]
    pub async fn trigger(
        &self,
        source: &BlockId,
        output: EventType,
        actor: &Actor,
        state: EventState,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let depth = CASCADE_DEPTH.try_with(|depth| *depth).unwrap_or(0);
        if depth >= MAX_CASCADE_DEPTH {
            warn!(depth, "Refusing to extend an event cascade");
            report.push(DeliveryRecord::refused(
                source,
                output,
                actor,
                format!("event cascade deeper than {MAX_CASCADE_DEPTH} deliveries"),
            ));
            return report;
        }

        let declared = self
            .table
            .descriptor(source)
            .is_some_and(|descriptor| descriptor.emits(output));
        if !declared {
            warn!("Refusing to trigger an undeclared output");
            report.push(DeliveryRecord::refused(
                source,
                output,
                actor,
                format!("{source} does not declare output {output}"),
            ));
            return report;
        }

        let event = PolicyEvent::new(output, source.clone(), actor.clone(), state);
        self.observers.publish(&event);

        for route in self.table.routes_from(source, output) {
            let mut record = DeliveryRecord::pending(route, actor);

            let accepted = self
                .table
                .descriptor(&route.target)
                .is_some_and(|descriptor| descriptor.accepts(route.input));
            if !accepted {
                warn!(route = %route, "Target does not accept routed input, skipping");
                record.status = DeliveryStatus::Undeliverable(format!(
                    "{} does not accept {}",
                    route.target, route.input
                ));
                report.push(record);
                continue;
            }

            let handler = self.handlers.read().get(&route.target).cloned();
            let Some(handler) = handler else {
                error!(route = %route, "No handler registered for target");
                record.status = DeliveryStatus::Failed("no handler registered".to_string());
                report.push(record);
                continue;
            };

            record.status = DeliveryStatus::Delivered;
            debug!(route = %route, "Delivering event");

            let delivery = handler.on_event(event.addressed(route.target.clone(), route.input), self);
            match CASCADE_DEPTH.scope(depth + 1, delivery).await {
                Ok(handled) => {
                    record.status = DeliveryStatus::Completed;
                    record.warnings = handled.warnings;
                    report.push(record);
                    report.merge(handled.report);
                }
                Err(err) => {
                    error!(route = %route, error = %err, "Delivery failed");
                    record.status = DeliveryStatus::Failed(err.to_string());
                    report.push(record);
                }
            }
        }

        report
    }
}
