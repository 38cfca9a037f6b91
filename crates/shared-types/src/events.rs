//! # Policy Events
//!
//! Typed events exchanged between block instances.
//!
//! Events are ephemeral: they are created by a block trigger, delivered by
//! the dispatcher and then dropped. Nothing here is persisted.

use crate::documents::DocumentRecord;
use crate::entities::{Actor, BlockId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Event types a block can accept or emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    /// Hands documents to the next block in the flow.
    RunEvent,
    /// Tells UI observers the block's state changed.
    RefreshEvent,
    /// Reports a block failure downstream.
    ErrorEvent,
    /// Releases a block that was waiting for input.
    ReleaseEvent,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 4] = [
        EventType::RunEvent,
        EventType::RefreshEvent,
        EventType::ErrorEvent,
        EventType::ReleaseEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunEvent => "RunEvent",
            Self::RefreshEvent => "RefreshEvent",
            Self::ErrorEvent => "ErrorEvent",
            Self::ReleaseEvent => "ReleaseEvent",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data carried by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventState {
    /// Documents handed over by the source block.
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    /// Free-form block data (refresh payloads, error messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<DocumentRecord>) -> Self {
        Self {
            documents,
            data: None,
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            documents: Vec::new(),
            data: Some(data),
        }
    }
}

/// A single event delivery unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvent {
    /// Unique id of this event.
    pub id: Uuid,
    /// Event type. Matches the source's output and the target's input.
    pub event_type: EventType,
    /// Block that triggered the event.
    pub source: BlockId,
    /// Receiving block. `None` for events only published to observers.
    pub target: Option<BlockId>,
    /// Actor whose action caused the event.
    pub actor: Actor,
    /// Event data.
    pub payload: EventState,
}

impl PolicyEvent {
    /// Create an untargeted event.
    pub fn new(event_type: EventType, source: BlockId, actor: Actor, payload: EventState) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            source,
            target: None,
            actor,
            payload,
        }
    }

    /// Address the event to a receiving block, possibly re-typing it for the
    /// receiver's input.
    #[must_use]
    pub fn addressed(&self, target: BlockId, input: EventType) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: input,
            source: self.source.clone(),
            target: Some(target),
            actor: self.actor.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// A resolved wiring from a source output to a target input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRoute {
    pub source: BlockId,
    pub output: EventType,
    pub target: BlockId,
    pub input: EventType,
}

impl fmt::Display for EventRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.output, self.target, self.input
        )
    }
}
