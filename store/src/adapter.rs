//! Entity store adapter.
//!
//! `EntityStore` is the only writer of audit fields. It turns typed
//! [`Document`]s into backend writes, assigns ids to new documents and
//! retries an update once when the backend reports a stream reset.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::backend::DocumentStore;
use crate::document::{Document, Fields, SYSTEM_AUTHOR, field};
use crate::error::{Result, StoreError};
use crate::query::{Filter, Query, Sort};

/// Generic CRUD adapter over a [`DocumentStore`].
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn DocumentStore>,
}

impl EntityStore {
    /// Create an adapter over a backend.
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn DocumentStore> {
        &self.backend
    }

    /// Load documents from a collection.
    pub async fn load(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        check_collection(collection)?;
        let rows = self.backend.query(collection, query).await?;
        debug!("Loaded {} documents from {collection}", rows.len());
        rows.into_iter().map(Document::from_fields).collect()
    }

    /// Load every document of a collection scoped to one game system, by name.
    pub async fn load_for_system(&self, collection: &str, system_id: &str) -> Result<Vec<Document>> {
        let query = Query::new()
            .filter(Filter::eq(field::SYSTEM_ID, system_id))
            .order_by(Sort::asc(field::NAME));
        self.load(collection, &query).await
    }

    /// Fetch a document by id.
    pub async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        check_collection(collection)?;
        self.backend
            .get(collection, id)
            .await?
            .map(Document::from_fields)
            .transpose()
    }

    /// Save a document, creating it when it has no permanent id yet.
    ///
    /// Caller-supplied audit fields are ignored, including envelope keys
    /// smuggled in through the field map. Updates keep the stored creation
    /// stamps and never move `_updatedAt` behind the stored value. Returns
    /// the document as written.
    pub async fn save(
        &self,
        collection: &str,
        mut document: Document,
        author: Option<&str>,
    ) -> Result<Document> {
        check_collection(collection)?;
        let author = author.unwrap_or(SYSTEM_AUTHOR).to_string();
        let now = Utc::now();
        for key in field::ENVELOPE {
            document.fields.remove(key);
        }

        if document.is_new() {
            let id = uuid::Uuid::new_v4().simple().to_string();
            document.id = Some(id.clone());
            document.created_at = Some(now);
            document.updated_at = Some(now);
            document.created_by = Some(author.clone());
            document.updated_by = Some(author);
            document.is_updated = false;

            let fields = document.clone().into_fields()?;
            self.backend.set(collection, &id, fields).await?;
            debug!("Created {collection}/{id}");
            return Ok(document);
        }

        let id = document
            .saved_id()
            .map(str::to_string)
            .ok_or_else(|| StoreError::InvalidDocument("document has no id".to_string()))?;

        let stored = self
            .get_by_id(collection, &id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.clone(),
            })?;

        // Never move the update stamp behind the stored one.
        let updated_at = stored.updated_at.map_or(now, |previous| previous.max(now));
        document.updated_at = Some(updated_at);
        document.created_at = stored.created_at;
        document.created_by = stored.created_by;
        if document.references.is_none() {
            document.references = stored.references;
        }
        document.updated_by = Some(author);
        document.is_updated = true;

        let mut fields = document.clone().into_fields()?;
        fields.remove(field::CREATED_AT);
        fields.remove(field::CREATED_BY);

        self.update_with_retry(collection, &id, fields).await?;
        debug!("Updated {collection}/{id}");
        Ok(document)
    }

    /// Delete a document. Missing documents are not an error.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        check_collection(collection)?;
        self.backend.delete(collection, id).await
    }

    /// Run an update, retrying once on a stream reset.
    ///
    /// If the retry fails too, the first error is returned.
    async fn update_with_retry(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        match self.backend.update(collection, id, fields.clone()).await {
            Ok(()) => Ok(()),
            Err(first) if first.is_stream_reset() => {
                warn!("Update of {collection}/{id} hit a stream reset, retrying once");
                match self.backend.update(collection, id, fields).await {
                    Ok(()) => Ok(()),
                    Err(second) => {
                        warn!("Retry of {collection}/{id} failed: {second}");
                        Err(first)
                    }
                }
            }
            Err(other) => Err(other),
        }
    }
}

fn check_collection(collection: &str) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(StoreError::InvalidQuery("empty collection name".to_string()));
    }
    Ok(())
}
