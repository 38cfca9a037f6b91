//! # Block Descriptors
//!
//! Static metadata describing a block type: what it can do, which events it
//! accepts and emits, and which children it may own.
//!
//! Descriptors are plain values. They are built once with the fluent builder
//! and then registered; nothing mutates them afterwards.
//!
//! ```rust
//! use shared_types::{BlockDescriptor, EventType};
//!
//! let mint = BlockDescriptor::new("mintDocumentBlock")
//!     .event()
//!     .external_events()
//!     .default_event()
//!     .inputs([EventType::RunEvent])
//!     .outputs([EventType::RunEvent, EventType::RefreshEvent]);
//!
//! assert!(mint.accepts(EventType::RunEvent));
//! assert!(!mint.emits(EventType::ErrorEvent));
//! ```

use crate::events::EventType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Capability flags of a block type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Has a primary action an actor can invoke.
    pub is_action: bool,
    /// Reacts to events from other blocks.
    pub is_event: bool,
    /// Keeps per-actor state.
    pub has_state: bool,
    /// Checks documents produced by its parent.
    pub is_validator: bool,
    /// Causes effects outside the engine (ledger writes).
    pub publishes_external_event: bool,
}

/// Which children a block type may own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "types")]
pub enum ChildrenPolicy {
    /// No children at all.
    #[default]
    None,
    /// Any block type.
    Any,
    /// Only the listed block types.
    Specific(Vec<String>),
}

impl ChildrenPolicy {
    pub fn allows(&self, child_type: &str) -> bool {
        match self {
            Self::None => false,
            Self::Any => true,
            Self::Specific(types) => types.iter().any(|t| t == child_type),
        }
    }
}

/// Who drives the block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlKind {
    /// Rendered and driven by a user interface.
    Ui,
    /// Runs server-side only.
    #[default]
    Server,
}

/// Immutable metadata of one block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDescriptor {
    pub block_type: String,
    pub capabilities: Capabilities,
    pub inputs: BTreeSet<EventType>,
    pub outputs: BTreeSet<EventType>,
    /// Forwards `RunEvent` to the next sibling without an explicit link.
    pub default_event: bool,
    pub children: ChildrenPolicy,
    pub control: ControlKind,
    #[serde(default)]
    pub description: String,
}

impl BlockDescriptor {
    /// Start a descriptor with no capabilities, no events and no children.
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            capabilities: Capabilities::default(),
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            default_event: false,
            children: ChildrenPolicy::None,
            control: ControlKind::Server,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn action(mut self) -> Self {
        self.capabilities.is_action = true;
        self
    }

    #[must_use]
    pub fn event(mut self) -> Self {
        self.capabilities.is_event = true;
        self
    }

    #[must_use]
    pub fn with_state(mut self) -> Self {
        self.capabilities.has_state = true;
        self
    }

    #[must_use]
    pub fn validator(mut self) -> Self {
        self.capabilities.is_validator = true;
        self
    }

    #[must_use]
    pub fn external_events(mut self) -> Self {
        self.capabilities.publishes_external_event = true;
        self
    }

    #[must_use]
    pub fn inputs(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.inputs.extend(events);
        self
    }

    #[must_use]
    pub fn outputs(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.outputs.extend(events);
        self
    }

    #[must_use]
    pub fn default_event(mut self) -> Self {
        self.default_event = true;
        self
    }

    #[must_use]
    pub fn children(mut self, policy: ChildrenPolicy) -> Self {
        self.children = policy;
        self
    }

    #[must_use]
    pub fn control(mut self, control: ControlKind) -> Self {
        self.control = control;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true if the block accepts `event_type` as input.
    pub fn accepts(&self, event_type: EventType) -> bool {
        self.inputs.contains(&event_type)
    }

    /// Returns true if the block may trigger `event_type`.
    pub fn emits(&self, event_type: EventType) -> bool {
        self.outputs.contains(&event_type)
    }

    pub fn allows_child(&self, child_type: &str) -> bool {
        self.children.allows(child_type)
    }
}
