//! Mention scanning.
//!
//! An entity is mentioned by every document, in a collection permitted by the
//! policy, whose reference map records the entity's id against the entity's
//! own collection. Each permitted collection is queried concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};
use warbook_store::document::field;
use warbook_store::{Document, EntityStore, Filter, Query};

use crate::error::{MentionError, Result};
use crate::policy::MentionPolicy;

/// Incoming references to one entity, grouped by mentioning collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Mentions(BTreeMap<String, Vec<Document>>);

impl Mentions {
    /// Create an empty set of mentions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the mentions found in one collection.
    pub fn insert(&mut self, collection: impl Into<String>, documents: Vec<Document>) {
        self.0.insert(collection.into(), documents);
    }

    /// Mentions from one collection.
    pub fn get(&self, collection: &str) -> Option<&[Document]> {
        self.0.get(collection).map(Vec::as_slice)
    }

    /// Total number of mentioning documents across all collections.
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Whether no collection was scanned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(collection, documents)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Document])> {
        self.0.iter().map(|(c, d)| (c.as_str(), d.as_slice()))
    }
}

/// Query that finds documents referring to `id` in `collection`.
pub fn mention_query(id: &str, collection: &str) -> Query {
    Query::new()
        .filter(Filter::eq(
            format!("{}.{id}", field::REFERENCES),
            collection,
        ))
        .unsorted()
}

/// Fans mention queries out over the permitted collections.
#[derive(Clone)]
pub struct MentionScanner {
    store: Arc<EntityStore>,
    policy: Arc<MentionPolicy>,
}

impl MentionScanner {
    /// Create a scanner.
    pub fn new(store: Arc<EntityStore>, policy: Arc<MentionPolicy>) -> Self {
        Self { store, policy }
    }

    /// The policy in use.
    pub fn policy(&self) -> &MentionPolicy {
        &self.policy
    }

    /// Find every document that mentions `entity`, which lives in `collection`.
    ///
    /// All sub-queries settle before anything is returned. If any of them
    /// failed, the first failure in policy order is returned.
    pub async fn scan(&self, entity: &Document, collection: &str) -> Result<Mentions> {
        let id = entity.saved_id().ok_or(MentionError::Unsaved)?;
        let sources = self.policy.can_be_mentioned_by(collection);
        if sources.is_empty() {
            return Ok(Mentions::new());
        }

        let query = mention_query(id, collection);
        let results = join_all(sources.iter().map(|source| {
            let query = &query;
            async move { (source, self.store.load(source, query).await) }
        }))
        .await;

        let mut mentions = Mentions::new();
        let mut first_error = None;
        for (source, result) in results {
            match result {
                Ok(documents) => mentions.insert(source.clone(), documents),
                Err(e) => {
                    warn!("Mention query on {source} for {collection}/{id} failed: {e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e.into());
        }

        debug!(
            "Found {} mentions of {collection}/{id} across {} collections",
            mentions.total(),
            sources.len()
        );
        Ok(mentions)
    }
}
