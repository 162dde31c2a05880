//! Bulk collection deletion for maintenance and test cleanup.

use tracing::{debug, info};

use crate::backend::DocumentStore;
use crate::document::field;
use crate::error::{Result, StoreError};
use crate::query::{Query, Sort};

/// Default number of documents deleted per batch.
pub const DEFAULT_BATCH_SIZE: usize = 15;

/// Delete every document in a collection, `batch_size` at a time.
///
/// Each round queries the first `batch_size` documents by `_id` and deletes
/// them in one atomic batch, stopping once a query comes back empty. A
/// round that returns the same ids as the one before is an error, since
/// the backend is not removing what it reports.
/// Returns the number of documents deleted.
pub async fn delete_collection(
    store: &dyn DocumentStore,
    collection: &str,
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(StoreError::InvalidQuery("batch size must be positive".to_string()));
    }

    let query = Query::new().order_by(Sort::asc(field::ID)).limit(batch_size);
    let mut deleted = 0;
    let mut previous: Vec<String> = Vec::new();

    loop {
        let batch = store.query(collection, &query).await?;
        if batch.is_empty() {
            break;
        }

        let ids: Vec<String> = batch
            .iter()
            .filter_map(|doc| doc.get(field::ID).and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();
        if ids.len() != batch.len() {
            return Err(StoreError::InvalidDocument(format!(
                "{collection} holds documents without an {} field",
                field::ID
            )));
        }

        if ids == previous {
            return Err(StoreError::InvalidDocument(format!(
                "deleting from {collection} made no progress"
            )));
        }

        store.delete_batch(collection, &ids).await?;
        deleted += ids.len();
        debug!("Deleted {} documents from {collection}", ids.len());
        previous = ids;
    }

    info!("Deleted collection {collection} ({deleted} documents)");
    Ok(deleted)
}
