//! Domain layer: the lineage protocol and the schema cache.

pub mod lineage;
pub mod schema_cache;

pub use lineage::{
    collection_for, AggregateSubmission, Collaborators, DocumentLineage, RecordMetadata,
    SubmittedDocument,
};
pub use schema_cache::SchemaCache;
