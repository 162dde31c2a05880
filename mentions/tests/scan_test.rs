//! End-to-end mention scanning over an in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use warbook_mentions::{
    MentionError, MentionPolicy, MentionScanner, ReferenceCounter, ReferenceEditor,
    with_reference,
};
use warbook_store::{
    Document, DocumentStore, EntityStore, Fields, MemoryStore, Query, ReferenceMap, StoreError,
};

fn policy(pairs: &[(&str, &[&str])]) -> Arc<MentionPolicy> {
    let edges: BTreeMap<String, Vec<String>> = pairs
        .iter()
        .map(|(s, ts)| (s.to_string(), ts.iter().map(|t| t.to_string()).collect()))
        .collect();
    Arc::new(MentionPolicy::new(edges).unwrap())
}

fn refs(pairs: &[(&str, &str)]) -> ReferenceMap {
    pairs
        .iter()
        .map(|(id, c)| (id.to_string(), c.to_string()))
        .collect()
}

#[tokio::test]
async fn test_profile_mentions_source() {
    let store = Arc::new(EntityStore::new(Arc::new(MemoryStore::new())));

    let s1 = store
        .save("sources", Document::new("S1"), None)
        .await
        .unwrap();
    let s1_id = s1.saved_id().unwrap().to_string();

    let p1 = store
        .save(
            "profiles",
            Document::new("P1").with_references(refs(&[(s1_id.as_str(), "sources")])),
            None,
        )
        .await
        .unwrap();
    // Same id recorded against the wrong collection is not a mention.
    store
        .save(
            "profiles",
            Document::new("P2").with_references(refs(&[(s1_id.as_str(), "keywords")])),
            None,
        )
        .await
        .unwrap();

    // S1 itself has no references.
    assert_eq!(s1.reference_count(), 0);

    let scanner = MentionScanner::new(store.clone(), policy(&[("profiles", &["sources"])]));
    let mentions = scanner.scan(&s1, "sources").await.unwrap();

    let found: Vec<_> = mentions.iter().collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "profiles");
    assert_eq!(found[0].1, std::slice::from_ref(&p1));
}

#[tokio::test]
async fn test_every_permitted_collection_is_scanned() {
    let store = Arc::new(EntityStore::new(Arc::new(MemoryStore::new())));
    let source = store
        .save("sources", Document::new("Codex"), None)
        .await
        .unwrap();
    let id = source.saved_id().unwrap().to_string();

    for (collection, name) in [("profiles", "Captain"), ("weapons", "Bolter"), ("weapons", "Melta")] {
        store
            .save(
                collection,
                Document::new(name).with_references(refs(&[(id.as_str(), "sources")])),
                None,
            )
            .await
            .unwrap();
    }

    let scanner = MentionScanner::new(
        store.clone(),
        policy(&[
            ("profiles", &["sources"]),
            ("weapons", &["sources"]),
            ("armors", &["sources"]),
        ]),
    );
    let mentions = scanner.scan(&source, "sources").await.unwrap();

    assert_eq!(mentions.total(), 3);
    assert_eq!(mentions.get("weapons").map(<[_]>::len), Some(2));
    assert_eq!(mentions.get("armors").map(<[_]>::len), Some(0));

    let counter = ReferenceCounter::default();
    let counts = counter.counts(&source, "sources", &mentions).await;
    assert_eq!(counts.mentions, 3);
    assert_eq!(counts.references, 0);
}

#[tokio::test]
async fn test_committed_references_show_up_as_mentions() {
    let store = Arc::new(EntityStore::new(Arc::new(MemoryStore::new())));
    let policy = policy(&[("profiles", &["traits"])]);
    let editor = ReferenceEditor::new(store.clone(), policy.clone());
    let scanner = MentionScanner::new(store.clone(), policy);

    let fearless = store
        .save("traits", Document::new("Fearless"), None)
        .await
        .unwrap();
    let trait_id = fearless.saved_id().unwrap().to_string();
    let captain = store
        .save("profiles", Document::new("Captain"), None)
        .await
        .unwrap();

    assert_eq!(scanner.scan(&fearless, "traits").await.unwrap().total(), 0);

    editor
        .commit(
            "profiles",
            captain,
            with_reference(ReferenceMap::new(), &trait_id, "traits"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(scanner.scan(&fearless, "traits").await.unwrap().total(), 1);

    // Deleting the trait leaves the profile's reference dangling.
    store.delete("traits", &trait_id).await.unwrap();
    let profiles = store.load("profiles", &Query::new()).await.unwrap();
    assert_eq!(profiles[0].reference_count(), 1);
}

/// Backend where one collection's queries fail after every other query
/// has been counted.
struct PartiallyBroken {
    inner: MemoryStore,
    broken: &'static str,
    queries: AtomicUsize,
}

#[async_trait]
impl DocumentStore for PartiallyBroken {
    fn name(&self) -> &str {
        "partially-broken"
    }
    async fn get(&self, c: &str, id: &str) -> warbook_store::Result<Option<Fields>> {
        self.inner.get(c, id).await
    }
    async fn set(&self, c: &str, id: &str, f: Fields) -> warbook_store::Result<()> {
        self.inner.set(c, id, f).await
    }
    async fn update(&self, c: &str, id: &str, f: Fields) -> warbook_store::Result<()> {
        self.inner.update(c, id, f).await
    }
    async fn delete(&self, c: &str, id: &str) -> warbook_store::Result<()> {
        self.inner.delete(c, id).await
    }
    async fn query(&self, c: &str, q: &Query) -> warbook_store::Result<Vec<Fields>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if c == self.broken {
            return Err(StoreError::StreamReset("query dropped".to_string()));
        }
        self.inner.query(c, q).await
    }
    async fn delete_batch(&self, c: &str, ids: &[String]) -> warbook_store::Result<()> {
        self.inner.delete_batch(c, ids).await
    }
}

#[tokio::test]
async fn test_failed_sub_query_fails_scan_after_all_settle() {
    let backend = Arc::new(PartiallyBroken {
        inner: MemoryStore::new(),
        broken: "profiles",
        queries: AtomicUsize::new(0),
    });
    let store = Arc::new(EntityStore::new(backend.clone()));
    let scanner = MentionScanner::new(
        store,
        policy(&[
            ("profiles", &["sources"]),
            ("weapons", &["sources"]),
            ("traits", &["sources"]),
        ]),
    );

    let entity = Document::new("Core").with_id("s1");
    let err = scanner.scan(&entity, "sources").await.unwrap_err();

    assert!(matches!(err, MentionError::Store(StoreError::StreamReset(_))));
    assert_eq!(backend.queries.load(Ordering::SeqCst), 3);
}
