//! # Busy Guard
//!
//! RAII handle for a block that is *Busy* for one actor.
//!
//! ```text
//! Active ──try_acquire──→ Busy ──complete/drop──→ Active
//!                           └───fail/interrupt──→ Active (lastError set)
//! ```
//!
//! The guard restores `active: true` in `Drop`, so availability comes back
//! on success, on error, on panic and when an outer deadline drops the
//! action future.

use crate::store::{default_state, with_object, StateKey, StateMap, ACTIVE, LAST_ERROR};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Pending,
    Succeeded,
    Failed(String),
}

/// Marks a (block, actor) pair busy until dropped.
#[must_use = "dropping the guard immediately makes the block available again"]
#[derive(Debug)]
pub struct BusyGuard {
    entries: Arc<StateMap>,
    key: StateKey,
    outcome: Outcome,
}

impl BusyGuard {
    pub(crate) fn new(entries: Arc<StateMap>, key: StateKey) -> Self {
        Self {
            entries,
            key,
            outcome: Outcome::Pending,
        }
    }

    /// The action succeeded; clears any previous `lastError`.
    pub fn complete(&mut self) {
        self.outcome = Outcome::Succeeded;
    }

    /// The action failed; `message` is recorded as `lastError`.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.outcome = Outcome::Failed(message.into());
    }

    pub fn actor(&self) -> &str {
        &self.key.actor
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let last_error = match &self.outcome {
            Outcome::Succeeded => None,
            Outcome::Failed(message) => Some(message.clone()),
            Outcome::Pending if std::thread::panicking() => Some("action panicked".to_string()),
            Outcome::Pending => Some("action interrupted".to_string()),
        };

        let mut entry = self
            .entries
            .entry(self.key.clone())
            .or_insert_with(default_state);
        with_object(entry.value_mut(), |blob| {
            blob.insert(ACTIVE.to_string(), Value::Bool(true));
            match &last_error {
                Some(message) => {
                    blob.insert(LAST_ERROR.to_string(), Value::String(message.clone()));
                }
                None => {
                    blob.remove(LAST_ERROR);
                }
            }
        });
        drop(entry);

        match last_error {
            Some(message) => warn!(
                block_id = %self.key.block,
                actor = %self.key.actor,
                error = %message,
                "Block available again after failure"
            ),
            None => debug!(block_id = %self.key.block, actor = %self.key.actor, "Block available"),
        }
    }
}
