//! Reference map editing.
//!
//! Commits a new outgoing reference map through the store adapter. Targets
//! are checked against the policy but not for existence, so a map can point
//! at entities that were since deleted.

use std::sync::Arc;

use tracing::info;
use warbook_store::{Document, EntityStore, ReferenceMap};

use crate::error::{MentionError, Result};
use crate::policy::MentionPolicy;

/// Current reference map of an entity (empty when absent).
pub fn references(entity: &Document) -> ReferenceMap {
    entity.references.clone().unwrap_or_default()
}

/// `map` plus a reference to `target_id` in `target_collection`.
pub fn with_reference(
    mut map: ReferenceMap,
    target_id: impl Into<String>,
    target_collection: impl Into<String>,
) -> ReferenceMap {
    map.insert(target_id.into(), target_collection.into());
    map
}

/// `map` without any reference to `target_id`.
pub fn without_reference(mut map: ReferenceMap, target_id: &str) -> ReferenceMap {
    map.remove(target_id);
    map
}

/// Commits reference maps for entities.
#[derive(Clone)]
pub struct ReferenceEditor {
    store: Arc<EntityStore>,
    policy: Arc<MentionPolicy>,
}

impl ReferenceEditor {
    pub fn new(store: Arc<EntityStore>, policy: Arc<MentionPolicy>) -> Self {
        Self { store, policy }
    }

    /// Replace the reference map of `entity` and save it.
    pub async fn commit(
        &self,
        collection: &str,
        mut entity: Document,
        new_map: ReferenceMap,
        author: Option<&str>,
    ) -> Result<Document> {
        if entity.is_new() {
            return Err(MentionError::Unsaved);
        }

        if let Some(target_collection) = new_map
            .values()
            .find(|target| !self.policy.allows(collection, target))
        {
            return Err(MentionError::ReferenceNotAllowed {
                source_collection: collection.to_string(),
                target_collection: target_collection.clone(),
            });
        }

        let count = new_map.len();
        entity.references = Some(new_map);
        let saved = self.store.save(collection, entity, author).await?;
        info!(
            "Committed {count} references for {collection}/{}",
            saved.saved_id().unwrap_or_default()
        );
        Ok(saved)
    }
}
