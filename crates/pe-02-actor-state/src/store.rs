//! # Actor State Store
//!
//! State blobs keyed by (block uuid, actor). Every blob is a JSON object;
//! the `active` field drives the availability gate and `lastError` records
//! the failure of the last action.

use crate::error::StateError;
use crate::guard::BusyGuard;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use shared_types::{Actor, BlockId};
use std::sync::Arc;
use tracing::debug;

pub(crate) const ACTIVE: &str = "active";
pub(crate) const LAST_ERROR: &str = "lastError";

/// Key of one state blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct StateKey {
    pub(crate) block: BlockId,
    pub(crate) actor: String,
}

impl StateKey {
    fn new(block: &BlockId, actor: &Actor) -> Self {
        Self {
            block: block.clone(),
            actor: actor.state_key(),
        }
    }
}

pub(crate) type StateMap = DashMap<StateKey, Value>;

/// Blob given to an actor on first access.
pub fn default_state() -> Value {
    json!({ "active": true })
}

/// Run `f` on the blob as an object. A blob that is not an object is
/// replaced with the default blob first.
pub(crate) fn with_object<R>(value: &mut Value, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
    match value {
        Value::Object(map) => f(map),
        other => {
            let mut map = Map::new();
            map.insert(ACTIVE.to_string(), Value::Bool(true));
            let result = f(&mut map);
            *other = Value::Object(map);
            result
        }
    }
}

/// Per-actor block state.
///
/// Cloning the store is cheap and shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct ActorStateStore {
    entries: Arc<StateMap>,
}

impl ActorStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current blob, created as `{active: true}` on first access.
    pub fn get(&self, block: &BlockId, actor: &Actor) -> Value {
        self.entries
            .entry(StateKey::new(block, actor))
            .or_insert_with(default_state)
            .clone()
    }

    /// Replace the blob. Callers are expected to follow up with a
    /// `RefreshEvent` for the actor.
    pub fn set(&self, block: &BlockId, actor: &Actor, state: Value) {
        debug!(block_id = %block, actor = %actor.state_key(), "Actor state replaced");
        self.entries.insert(StateKey::new(block, actor), state);
    }

    /// Merge fields into the blob, keeping the rest.
    pub fn update(&self, block: &BlockId, actor: &Actor, fields: Map<String, Value>) {
        let mut entry = self
            .entries
            .entry(StateKey::new(block, actor))
            .or_insert_with(default_state);
        with_object(entry.value_mut(), |blob| blob.extend(fields));
    }

    /// A blob without a boolean `active` field counts as active.
    pub fn is_active(&self, block: &BlockId, actor: &Actor) -> bool {
        self.entries
            .get(&StateKey::new(block, actor))
            .map(|entry| is_active(entry.value()))
            .unwrap_or(true)
    }

    pub fn set_active(&self, block: &BlockId, actor: &Actor, active: bool) {
        let mut entry = self
            .entries
            .entry(StateKey::new(block, actor))
            .or_insert_with(default_state);
        with_object(entry.value_mut(), |blob| {
            blob.insert(ACTIVE.to_string(), Value::Bool(active));
        });
    }

    /// Atomically test and clear `active`.
    ///
    /// The returned guard makes the block available again when dropped,
    /// whatever way the action ends.
    pub fn try_acquire(&self, block: &BlockId, actor: &Actor) -> Result<BusyGuard, StateError> {
        let key = StateKey::new(block, actor);
        {
            let mut entry = self
                .entries
                .entry(key.clone())
                .or_insert_with(default_state);
            if !is_active(entry.value()) {
                return Err(StateError::Busy {
                    block: block.clone(),
                    actor: key.actor,
                });
            }
            with_object(entry.value_mut(), |blob| {
                blob.insert(ACTIVE.to_string(), Value::Bool(false));
            });
        }
        debug!(block_id = %block, actor = %key.actor, "Block busy");
        Ok(BusyGuard::new(self.entries.clone(), key))
    }

    /// All blobs of one block, ordered by actor.
    pub fn snapshot(&self, block: &BlockId) -> Vec<(String, Value)> {
        let mut blobs: Vec<(String, Value)> = self
            .entries
            .iter()
            .filter(|entry| &entry.key().block == block)
            .map(|entry| (entry.key().actor.clone(), entry.value().clone()))
            .collect();
        blobs.sort_by(|a, b| a.0.cmp(&b.0));
        blobs
    }

    /// Number of (block, actor) blobs held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_active(value: &Value) -> bool {
    value.get(ACTIVE).and_then(Value::as_bool).unwrap_or(true)
}
