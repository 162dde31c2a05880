//! Reference and mention counts.
//!
//! A live recount can transiently come back empty. When that happens and a
//! previous nonzero count is cached for the same `(entity, collection)` pair,
//! the cached count is displayed instead and the result is marked stale.
//!
//! This can mask a real drop to zero for as long as the entry stays cached.
//! Setting `zero_confirmations` drops the cached count after that many
//! consecutive zero reads; the default keeps it indefinitely.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use warbook_store::Document;

use crate::scanner::Mentions;

/// Configuration for the mention-count cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Maximum cached `(entity, collection)` pairs.
    pub max_entries: usize,

    /// Consecutive zero reads after which a cached count is dropped.
    /// `None` never drops it.
    pub zero_confirmations: Option<u32>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            zero_confirmations: None,
        }
    }
}

/// Counts shown for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCounts {
    /// Outgoing references.
    pub references: usize,

    /// Incoming mentions, possibly from the cache.
    pub mentions: usize,

    /// Whether `mentions` came from the cache rather than the live count.
    pub stale: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    count: usize,
    zero_reads: u32,
    written: u64,
}

type CacheKey = (String, String);

/// Last-known-nonzero mention counts.
pub struct MentionCountCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    config: CounterConfig,
    clock: AtomicU64,
}

impl MentionCountCache {
    /// Create an empty cache.
    pub fn new(config: CounterConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            config,
            clock: AtomicU64::new(0),
        }
    }

    /// Resolve the count to display for a live total.
    ///
    /// Returns `(count, stale)`.
    pub async fn resolve(&self, entity_id: &str, collection: &str, live: usize) -> (usize, bool) {
        let key = (entity_id.to_string(), collection.to_string());
        let mut entries = self.entries.write().await;

        if live > 0 {
            let written = self.clock.fetch_add(1, Ordering::Relaxed);

            // Evict the least recently written entry if at capacity.
            if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.written)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }

            if self.config.max_entries > 0 {
                entries.insert(
                    key,
                    CacheEntry {
                        count: live,
                        zero_reads: 0,
                        written,
                    },
                );
            }
            return (live, false);
        }

        let Some(entry) = entries.get_mut(&key) else {
            return (0, false);
        };

        entry.zero_reads = entry.zero_reads.saturating_add(1);
        if let Some(limit) = self.config.zero_confirmations {
            if entry.zero_reads >= limit {
                debug!("Dropping cached mention count for {entity_id} in {collection}");
                entries.remove(&key);
                return (0, false);
            }
        }

        debug!("Showing cached mention count {} for {entity_id}", entry.count);
        (entry.count, true)
    }

    /// Forget a cached count.
    pub async fn invalidate(&self, entity_id: &str, collection: &str) {
        self.entries
            .write()
            .await
            .remove(&(entity_id.to_string(), collection.to_string()));
    }

    /// Number of cached pairs.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Computes the counts displayed next to an entity.
pub struct ReferenceCounter {
    cache: MentionCountCache,
}

impl ReferenceCounter {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            cache: MentionCountCache::new(config),
        }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &MentionCountCache {
        &self.cache
    }

    /// Counts for `entity` in `collection` given a freshly scanned `mentions`.
    pub async fn counts(
        &self,
        entity: &Document,
        collection: &str,
        mentions: &Mentions,
    ) -> ReferenceCounts {
        let references = entity.reference_count();
        let live = mentions.total();
        let (mentions, stale) = match entity.saved_id() {
            Some(id) => self.cache.resolve(id, collection, live).await,
            None => (live, false),
        };

        ReferenceCounts {
            references,
            mentions,
            stale,
        }
    }
}

impl Default for ReferenceCounter {
    fn default() -> Self {
        Self::new(CounterConfig::default())
    }
}
