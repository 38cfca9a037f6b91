//! Per-block schema cache.

use crate::domain::lineage::DocumentLineage;
use crate::error::{LineageError, LineageResult};
use shared_types::Schema;
use tokio::sync::OnceCell;

/// Lazily loaded schema of one block instance.
///
/// Concurrent first accesses share a single repository lookup. A schema that
/// is not found is not cached, so a later call tries again.
#[derive(Debug)]
pub struct SchemaCache {
    iri: String,
    cell: OnceCell<Schema>,
}

impl SchemaCache {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    /// The schema, if it has been loaded already.
    pub fn loaded(&self) -> Option<&Schema> {
        self.cell.get()
    }

    pub async fn get(&self, lineage: &DocumentLineage) -> LineageResult<&Schema> {
        self.cell
            .get_or_try_init(|| async {
                lineage
                    .load_schema(&self.iri)
                    .await?
                    .ok_or_else(|| LineageError::SchemaUnresolved(self.iri.clone()))
            })
            .await
    }
}
