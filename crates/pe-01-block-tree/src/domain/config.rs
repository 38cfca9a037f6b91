//! # Policy Documents
//!
//! The authored JSON form of a policy: a tree of block configurations with
//! their options and event links.
//!
//! ```json
//! {
//!   "id": "policy-1",
//!   "name": "Carbon report",
//!   "topicId": "0.0.1",
//!   "root": {
//!     "blockType": "interfaceContainerBlock",
//!     "tag": "root",
//!     "children": [
//!       { "blockType": "requestVcDocumentBlock", "tag": "submit",
//!         "options": { "schema": "#report", "idType": "UUID" } }
//!     ]
//!   }
//! }
//! ```

use crate::error::{TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{BlockId, EventType, PolicyId, TopicId};

/// An authored policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    pub id: PolicyId,
    #[serde(default)]
    pub name: String,
    /// Policy topic; inherited by blocks that do not set their own.
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    pub root: BlockConfig,
}

impl PolicyConfig {
    pub fn from_json(json: &str) -> TreeResult<Self> {
        serde_json::from_str(json).map_err(|e| TreeError::InvalidConfig(e.to_string()))
    }

    pub fn from_value(value: Value) -> TreeResult<Self> {
        serde_json::from_value(value).map_err(|e| TreeError::InvalidConfig(e.to_string()))
    }
}

/// One block of an authored policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfig {
    /// Instance id. Generated when omitted.
    #[serde(default)]
    pub id: Option<BlockId>,
    pub block_type: String,
    pub tag: String,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default = "empty_options")]
    pub options: Value,
    #[serde(default)]
    pub children: Vec<BlockConfig>,
    #[serde(default)]
    pub events: Vec<EventLink>,
}

fn empty_options() -> Value {
    Value::Object(Map::new())
}

impl BlockConfig {
    pub fn new(block_type: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: None,
            block_type: block_type.into(),
            tag: tag.into(),
            topic_id: None,
            options: empty_options(),
            children: Vec::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: BlockConfig) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: EventLink) -> Self {
        self.events.push(link);
        self
    }
}

/// An explicit event wiring from this block's output to another block's
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLink {
    pub output: EventType,
    /// Tag of the receiving block.
    pub target: String,
    pub input: EventType,
    #[serde(default)]
    pub disabled: bool,
}

impl EventLink {
    pub fn new(output: EventType, target: impl Into<String>, input: EventType) -> Self {
        Self {
            output,
            target: target.into(),
            input,
            disabled: false,
        }
    }
}
