//! The document backend seam.

use async_trait::async_trait;

use crate::document::Fields;
use crate::error::{Result, StoreError};
use crate::query::Query;

/// A document database addressed by collection name and document id.
///
/// Implementations perform exactly one write or delete per call; the
/// adapter layers audit stamping and retries on top.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>>;

    /// Create or overwrite a document.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Replace top-level fields of an existing document.
    ///
    /// Fails with `StoreError::NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Run a query against a collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Fields>>;

    /// Delete several documents as one atomic batch.
    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<()>;
}

/// Shallow merge used by `update`: every top-level key in `changes` replaces
/// the stored value.
pub(crate) fn merge_top_level(stored: &mut Fields, changes: Fields) {
    for (key, value) in changes {
        stored.insert(key, value);
    }
}

/// Reject document ids that cannot be addressed as a single path segment.
///
/// Dots are excluded because mention queries address `references.<id>` as a
/// dotted path.
pub(crate) fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(['.', '/', '\\']) {
        return Err(StoreError::InvalidDocument(format!("invalid id: {id:?}")));
    }
    Ok(())
}
