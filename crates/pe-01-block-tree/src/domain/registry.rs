//! # Block Registry
//!
//! Maps block type names to their descriptors. Populated once at startup,
//! then shared read-only (see `BlockRegistry::freeze`).

use crate::error::RegistryError;
use shared_types::BlockDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Descriptor lookup by block type.
#[derive(Debug, Default, Clone)]
pub struct BlockRegistry {
    descriptors: HashMap<String, Arc<BlockDescriptor>>,
}

impl BlockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. A block type can only be registered once.
    pub fn register(&mut self, descriptor: BlockDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(&descriptor.block_type) {
            return Err(RegistryError::DuplicateBlockType(descriptor.block_type));
        }
        debug!(block_type = %descriptor.block_type, "Registering block type");
        self.descriptors
            .insert(descriptor.block_type.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Look up a descriptor.
    pub fn describe(&self, block_type: &str) -> Result<Arc<BlockDescriptor>, RegistryError> {
        self.descriptors
            .get(block_type)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownBlockType(block_type.to_string()))
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.descriptors.contains_key(block_type)
    }

    /// Registered block types, sorted.
    pub fn block_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Finish registration. The returned handle has no mutating methods.
    #[must_use]
    pub fn freeze(self) -> Arc<BlockRegistry> {
        Arc::new(self)
    }
}
