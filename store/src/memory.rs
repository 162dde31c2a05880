//! In-memory backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{DocumentStore, check_id, merge_top_level};
use crate::document::Fields;
use crate::error::{Result, StoreError};
use crate::query::Query;

/// Documents of one collection, in id order.
pub(crate) type Collection = BTreeMap<String, Fields>;

/// Backend that keeps every collection in memory.
///
/// Default query order is ascending document id.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Whether a collection holds no documents.
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        check_id(id)?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        debug!("Set {collection}/{id}");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_top_level(stored, fields);
        debug!("Updated {collection}/{id}");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(c) = self.collections.write().await.get_mut(collection) {
            c.remove(id);
        }
        debug!("Deleted {collection}/{id}");
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Fields>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| query.apply(c.values()))
            .unwrap_or_default())
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<()> {
        // One write lock for the whole batch.
        let mut collections = self.collections.write().await;
        if let Some(c) = collections.get_mut(collection) {
            for id in ids {
                c.remove(id);
            }
        }
        debug!("Deleted batch of {} from {collection}", ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, Sort};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store
            .set("keywords", "k1", fields(json!({"_id": "k1", "name": "Infantry"})))
            .await
            .unwrap();

        let got = store.get("keywords", "k1").await.unwrap().unwrap();
        assert_eq!(got.get("name"), Some(&json!("Infantry")));

        store.delete("keywords", "k1").await.unwrap();
        assert!(store.get("keywords", "k1").await.unwrap().is_none());
        // Second delete is not an error.
        store.delete("keywords", "k1").await.unwrap();
        store.delete("missing-collection", "k1").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_is_shallow_and_requires_existing() {
        let store = MemoryStore::new();
        store
            .set(
                "profiles",
                "p1",
                fields(json!({"name": "P1", "references": {"a": "sources", "b": "keywords"}})),
            )
            .await
            .unwrap();

        store
            .update("profiles", "p1", fields(json!({"references": {"c": "traits"}})))
            .await
            .unwrap();
        let got = store.get("profiles", "p1").await.unwrap().unwrap();
        assert_eq!(got.get("references"), Some(&json!({"c": "traits"})));
        assert_eq!(got.get("name"), Some(&json!("P1")));

        let err = store
            .update("profiles", "nope", fields(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_query_and_batch_delete() {
        let store = MemoryStore::new();
        for (id, name, system) in [("a", "Zeta", "x"), ("b", "Alpha", "x"), ("c", "Mid", "y")] {
            store
                .set(
                    "traits",
                    id,
                    fields(json!({"_id": id, "name": name, "systemId": system})),
                )
                .await
                .unwrap();
        }

        let query = Query::new()
            .filter(Filter::eq("systemId", "x"))
            .order_by(Sort::asc("name"));
        let result = store.query("traits", &query).await.unwrap();
        let names: Vec<_> = result.iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("Alpha"), json!("Zeta")]);

        store
            .delete_batch("traits", &["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(store.len("traits").await, 1);
    }

    #[tokio::test]
    async fn test_dotted_ids_are_rejected() {
        let store = MemoryStore::new();
        let err = store
            .set("traits", "core.v2", fields(json!({"name": "Dotted"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
        assert!(store.is_empty("traits").await);
    }
}
