//! Validation result container.

use serde::{Deserialize, Serialize};
use shared_types::BlockId;
use std::collections::BTreeMap;

/// Configuration errors keyed by block uuid.
///
/// Errors are appended, never replaced: one run collects every problem of
/// every block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResults {
    errors: BTreeMap<BlockId, Vec<String>>,
}

impl ValidationResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, block: &BlockId, message: impl Into<String>) {
        self.errors
            .entry(block.clone())
            .or_default()
            .push(message.into());
    }

    pub fn extend(&mut self, block: &BlockId, messages: impl IntoIterator<Item = String>) {
        let mut messages = messages.into_iter().peekable();
        if messages.peek().is_some() {
            self.errors.entry(block.clone()).or_default().extend(messages);
        }
    }

    /// A policy is valid when no block has an error.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_for(&self, block: &BlockId) -> &[String] {
        self.errors.get(block).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All (block, message) pairs, ordered by block uuid.
    pub fn entries(&self) -> impl Iterator<Item = (&BlockId, &str)> {
        self.errors
            .iter()
            .flat_map(|(block, messages)| messages.iter().map(move |m| (block, m.as_str())))
    }

    pub fn invalid_blocks(&self) -> impl Iterator<Item = &BlockId> {
        self.errors.keys()
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}
