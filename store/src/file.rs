//! JSON file backend.
//!
//! Each collection is a directory under the root and each document a
//! pretty-printed JSON file named after its id. All documents are loaded into
//! memory on open; writes go to disk first and then to the cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{DocumentStore, check_id, merge_top_level};
use crate::document::{Fields, field};
use crate::error::{Result, StorageError, StoreError};
use crate::memory::Collection;
use crate::query::Query;

/// Backend that persists documents as JSON files.
pub struct FileStore {
    /// Root directory for document storage.
    root: PathBuf,

    /// In-memory copy of every collection.
    cache: RwLock<HashMap<String, Collection>>,
}

impl FileStore {
    /// Open a file store at the given root directory.
    ///
    /// This will create the directory if it doesn't exist.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        let store = Self {
            root,
            cache: RwLock::new(HashMap::new()),
        };
        store.load_all().await?;
        Ok(store)
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{id}.json"))
    }

    /// Load every collection directory from disk.
    async fn load_all(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", self.root.display())))?;

        let mut cache = self.cache.write().await;
        let mut total = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(collection) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let documents = self.load_collection(&path).await?;
            total += documents.len();
            cache.insert(collection.to_string(), documents);
        }

        info!("Loaded {total} documents from {}", self.root.display());
        Ok(())
    }

    async fn load_collection(&self, dir: &Path) -> Result<Collection> {
        let mut documents = Collection::new();
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", dir.display())))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            if let Err(e) = check_id(&id) {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
            match self.load_file(&path).await {
                Ok(fields) => {
                    let mismatched = fields
                        .get(field::ID)
                        .and_then(|v| v.as_str())
                        .is_some_and(|stored| stored != id);
                    if mismatched {
                        warn!("Skipping {}: stored id does not match file name", path.display());
                    } else {
                        documents.insert(id, fields);
                    }
                }
                Err(e) => {
                    warn!("Failed to load document {}: {e}", path.display());
                }
            }
        }

        Ok(documents)
    }

    async fn load_file(&self, path: &Path) -> Result<Fields> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a document atomically using a temp file.
    async fn save_file(&self, collection: &str, id: &str, fields: &Fields) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", dir.display())))?;

        let path = self.document_path(collection, id);
        let content = serde_json::to_string_pretty(fields)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;

        debug!("Saved document: {collection}/{id}");
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFile(format!("{}: {e}", path.display())).into()),
        }
    }
}

/// Reject names that would escape the collection directory.
fn check_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value.starts_with('.')
        || value.contains(['/', '\\'])
        || value.contains("..")
    {
        return Err(StoreError::InvalidDocument(format!("invalid {kind}: {value:?}")));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let cache = self.cache.read().await;
        Ok(cache.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        check_segment("collection", collection)?;
        check_id(id)?;

        let mut cache = self.cache.write().await;
        self.save_file(collection, id, &fields).await?;
        cache
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut cache = self.cache.write().await;
        let mut merged = cache
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_top_level(&mut merged, fields);

        self.save_file(collection, id, &merged).await?;
        cache
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), merged);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        check_segment("collection", collection)?;
        check_id(id)?;

        let mut cache = self.cache.write().await;
        self.remove_file(&self.document_path(collection, id)).await?;
        if let Some(c) = cache.get_mut(collection) {
            c.remove(id);
        }
        info!("Deleted document: {collection}/{id}");
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Fields>> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(collection)
            .map(|c| query.apply(c.values()))
            .unwrap_or_default())
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<()> {
        check_segment("collection", collection)?;
        for id in ids {
            check_id(id)?;
        }

        let mut cache = self.cache.write().await;

        // Stage every file first so a failure leaves the batch untouched.
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.document_path(collection, id);
            let staged_path = path.with_extension("json.deleting");
            match fs::rename(&path, &staged_path).await {
                Ok(()) => staged.push((path, staged_path)),
                // Already gone.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    for (original, staged_path) in staged {
                        if let Err(undo) = fs::rename(&staged_path, &original).await {
                            warn!("Failed to restore {}: {undo}", original.display());
                        }
                    }
                    return Err(
                        StorageError::DeleteFile(format!("{}: {e}", path.display())).into(),
                    );
                }
            }
        }

        for (_, staged_path) in &staged {
            self.remove_file(staged_path).await?;
        }
        if let Some(c) = cache.get_mut(collection) {
            for id in ids {
                c.remove(id);
            }
        }

        debug!("Deleted batch of {} from {collection}", staged.len());
        Ok(())
    }
}
