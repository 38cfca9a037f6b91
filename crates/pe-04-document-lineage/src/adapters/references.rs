//! Reference checks backed by the repository.

use crate::ports::{Collection, Filter, Repository};
use async_trait::async_trait;
use pe_03_validation::{ReferenceKind, ReferenceResolver};
use shared_types::CollaboratorError;
use std::sync::Arc;

/// Answers "does this schema / token exist" from storage.
#[derive(Clone)]
pub struct RepositoryReferences {
    repository: Arc<dyn Repository>,
}

impl RepositoryReferences {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ReferenceResolver for RepositoryReferences {
    async fn exists(&self, kind: ReferenceKind, id: &str) -> Result<bool, CollaboratorError> {
        let (collection, filter) = match kind {
            ReferenceKind::Schema => (Collection::Schemas, Filter::by("iri", id)),
            ReferenceKind::Token => (Collection::Tokens, Filter::by("tokenId", id)),
        };
        Ok(self.repository.find_one(collection, &filter).await?.is_some())
    }
}
