//! Per-collection load/save state.
//!
//! `CollectionState` is the boundary where store errors stop propagating:
//! failures are logged and recorded as state (an `error` string or a
//! transient [`Notice`]) instead of being returned.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::adapter::EntityStore;
use crate::document::Document;
use crate::query::Query;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient notification raised by a save or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Items, error and pending notice for one collection.
pub struct CollectionState {
    store: Arc<EntityStore>,
    collection: String,
    query: Query,
    items: Vec<Document>,
    error: Option<String>,
    notice: Option<Notice>,
}

impl CollectionState {
    /// Create state for a collection; nothing is loaded until `refresh`.
    pub fn new(store: Arc<EntityStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            query: Query::new(),
            items: Vec::new(),
            error: None,
            notice: None,
        }
    }

    /// Set the query used by `refresh`.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Currently loaded items.
    pub fn items(&self) -> &[Document] {
        &self.items
    }

    /// Take ownership of the loaded items.
    pub fn into_items(self) -> Vec<Document> {
        self.items
    }

    /// The last load error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Drain the pending notice.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Reload the items. A failure leaves the list empty.
    pub async fn refresh(&mut self) {
        match self.store.load(&self.collection, &self.query).await {
            Ok(items) => {
                self.items = items;
                self.error = None;
            }
            Err(e) => {
                error!("Failed to load {}: {e}", self.collection);
                self.items.clear();
                self.error = Some(e.to_string());
            }
        }
    }

    /// Save a document. Returns `None` on failure.
    pub async fn save(&mut self, document: Document, author: Option<&str>) -> Option<Document> {
        match self.store.save(&self.collection, document, author).await {
            Ok(saved) => {
                self.notice = Some(Notice::success(format!("Saved {}", saved.name)));
                match self
                    .items
                    .iter_mut()
                    .find(|item| item.saved_id().is_some() && item.saved_id() == saved.saved_id())
                {
                    Some(item) => *item = saved.clone(),
                    None => self.items.push(saved.clone()),
                }
                Some(saved)
            }
            Err(e) => {
                error!("Failed to save to {}: {e}", self.collection);
                self.notice = Some(Notice::error(format!("Save failed: {e}")));
                None
            }
        }
    }

    /// Delete a document by id. Returns `false` on failure.
    pub async fn remove(&mut self, id: &str) -> bool {
        match self.store.delete(&self.collection, id).await {
            Ok(()) => {
                self.items.retain(|item| item.saved_id() != Some(id));
                self.notice = Some(Notice::success("Deleted"));
                true
            }
            Err(e) => {
                error!("Failed to delete {}/{id}: {e}", self.collection);
                self.notice = Some(Notice::error(format!("Delete failed: {e}")));
                false
            }
        }
    }
}
