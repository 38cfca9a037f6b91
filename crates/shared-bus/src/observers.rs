//! # Observers
//!
//! Every event the dispatcher triggers is also fanned out to observers, so
//! that interfaces can follow Refresh events for the blocks and actors they
//! display.
//!
//! ```text
//! Dispatcher::trigger ──publish──→ ObserverBus ──┬──→ Subscription (filter)
//!                                   (broadcast)  └──→ Subscription (filter)
//! ```
//!
//! Observers never slow dispatch down. One that falls more than the bus
//! capacity behind skips the oldest events and counts them in
//! [`Subscription::missed`].

use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::{BlockId, EventType, PolicyEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace};

/// The bus behind a subscription was dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("observer bus closed")]
pub struct BusClosed;

// =============================================================================
// FILTER
// =============================================================================

/// Selects the events an observer sees. An empty criterion matches anything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_types: Vec<EventType>,
    /// Triggering blocks.
    pub blocks: Vec<BlockId>,
    /// Actor state keys.
    pub actors: Vec<String>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn event_types(event_types: Vec<EventType>) -> Self {
        Self {
            event_types,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_blocks(blocks: Vec<BlockId>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_actor(mut self, state_key: impl Into<String>) -> Self {
        self.actors.push(state_key.into());
        self
    }

    pub fn matches(&self, event: &PolicyEvent) -> bool {
        let actor = event.actor.state_key();
        (self.event_types.is_empty() || self.event_types.contains(&event.event_type))
            && (self.blocks.is_empty() || self.blocks.contains(&event.source))
            && (self.actors.is_empty() || self.actors.iter().any(|a| *a == actor))
    }
}

// =============================================================================
// BUS
// =============================================================================

/// Fan-out of triggered events to observers of one policy.
pub struct ObserverBus {
    sender: broadcast::Sender<PolicyEvent>,
    published: AtomicU64,
}

impl ObserverBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is the number of events an observer may fall behind.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(event_types = ?filter.event_types, blocks = filter.blocks.len(), "Observer subscribed");
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
            missed: 0,
        }
    }

    /// Hand `event` to every current observer; returns how many there were.
    pub fn publish(&self, event: &PolicyEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        // Sending fails only when nobody is subscribed.
        let observers = self.sender.send(event.clone()).unwrap_or(0);
        trace!(event_type = %event.event_type, block_id = %event.source, observers, "Event observed");
        observers
    }

    /// Events published since the bus was created.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for ObserverBus {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// One observer's view of the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<PolicyEvent>,
    filter: EventFilter,
    missed: u64,
}

impl Subscription {
    /// Wait for the next matching event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<PolicyEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already buffered, if any.
    pub fn try_recv(&mut self) -> Result<Option<PolicyEvent>, BusClosed> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(BusClosed),
            }
        }
    }

    /// Every matching event buffered right now.
    pub fn drain(&mut self) -> Vec<PolicyEvent> {
        std::iter::from_fn(|| self.try_recv().ok().flatten()).collect()
    }

    /// Events skipped because this observer fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn lagged(&mut self, skipped: u64) {
        debug!(skipped, "Observer fell behind");
        self.missed += skipped;
    }
}
