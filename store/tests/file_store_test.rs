//! Integration tests for the adapter over the JSON file backend.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use warbook_store::{
    Document, EntityStore, FileStore, Filter, Query, ReferenceMap, Sort, collections,
    delete_collection,
};

async fn open(dir: &TempDir) -> (Arc<FileStore>, EntityStore) {
    let backend = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let store = EntityStore::new(backend.clone());
    (backend, store)
}

#[tokio::test]
async fn test_documents_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let mut refs = ReferenceMap::new();
    refs.insert("A".to_string(), collections::PROFILES.to_string());

    let id = {
        let (_, store) = open(&temp_dir).await;
        let saved = store
            .save(
                collections::WEAPONS,
                Document::new("Chainsword")
                    .with_system("grimdark")
                    .with_references(refs.clone()),
                Some("alice"),
            )
            .await
            .unwrap();
        saved.saved_id().unwrap().to_string()
    };

    let (_, store) = open(&temp_dir).await;
    let loaded = store
        .get_by_id(collections::WEAPONS, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.name, "Chainsword");
    assert_eq!(loaded.references, Some(refs));
    assert_eq!(loaded.created_by.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_array_contains_and_sort_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let (_, store) = open(&temp_dir).await;

    for (name, tags) in [
        ("Plasma Gun", vec!["ranged", "heavy"]),
        ("Bolt Pistol", vec!["ranged", "pistol"]),
        ("Power Fist", vec!["melee"]),
    ] {
        store
            .save(
                collections::WEAPONS,
                Document::new(name).with_field("tags", tags),
                None,
            )
            .await
            .unwrap();
    }

    let query = Query::new()
        .filter(Filter::array_contains("tags", "ranged"))
        .order_by(Sort::desc("name"));
    let names: Vec<_> = store
        .load(collections::WEAPONS, &query)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["Plasma Gun", "Bolt Pistol"]);
}

#[tokio::test]
async fn test_delete_collection_clears_directory() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, store) = open(&temp_dir).await;

    for i in 0..20 {
        store
            .save(collections::KEYWORDS, Document::new(format!("Keyword {i}")), None)
            .await
            .unwrap();
    }

    let deleted = delete_collection(backend.as_ref(), collections::KEYWORDS, 15)
        .await
        .unwrap();
    assert_eq!(deleted, 20);

    let remaining = store
        .load(collections::KEYWORDS, &Query::new())
        .await
        .unwrap();
    assert!(remaining.is_empty());

    let files = std::fs::read_dir(temp_dir.path().join(collections::KEYWORDS))
        .unwrap()
        .count();
    assert_eq!(files, 0);
}

#[tokio::test]
async fn test_delete_collection_ignores_misnamed_files() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join(collections::KEYWORDS);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("a.json"), r#"{"_id": "b", "name": "Misfiled"}"#).unwrap();

    let (backend, store) = open(&temp_dir).await;
    store
        .save(collections::KEYWORDS, Document::new("Deep Strike"), None)
        .await
        .unwrap();

    let deleted = delete_collection(backend.as_ref(), collections::KEYWORDS, 15)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(dir.join("a.json").exists());
}
