//! # Shared Bus - Event Dispatch Between Block Instances
//!
//! Two channels carry policy events:
//!
//! ```text
//! ┌──────────────┐  trigger()   ┌──────────────┐  on_event()  ┌──────────────┐
//! │ Source block │ ───────────→ │  Dispatcher  │ ───────────→ │ Target block │
//! └──────────────┘              └──────┬───────┘   (routes)   └──────────────┘
//!                                      │ publish()
//!                                      ▼
//!                               ┌──────────────┐  subscribe()
//!                               │ Observer Bus │ ───────────→  observers
//!                               └──────────────┘
//! ```
//!
//! - **Dispatcher**: delivers events along the routes resolved from the block
//!   tree, checking the source's output set and the target's input set.
//! - **Observer Bus**: fan-out of every triggered event to observers (UI
//!   refresh, audit). Observers cannot influence delivery.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dispatcher;
pub mod observers;

pub use dispatcher::{
    BlockEventHandler, DeliveryRecord, DeliveryStatus, DispatchReport, Dispatcher, Handled,
    RoutingTable, MAX_CASCADE_DEPTH,
};
pub use observers::{BusClosed, EventFilter, ObserverBus, Subscription};

/// Events an observer may fall behind before it starts missing them.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
