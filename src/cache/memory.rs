//! In-memory response cache with optional persistence.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use crate::cache::store::CacheStore;
use crate::fetch::response::PersistedResponse;
use crate::fetch::StoredResponse;
use crate::observability::metrics;

/// A named, thread-safe response cache.
///
/// Clones share the same underlying map.
#[derive(Clone, Debug)]
pub struct MemoryCache {
    name: String,
    inner: Arc<DashMap<String, StoredResponse>>,
    persistence_path: Option<String>,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new(name: impl Into<String>, persistence_path: Option<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists, otherwise start empty.
    ///
    /// Entries that fail to decode are skipped with a warning.
    pub fn load_from_file(name: impl Into<String>, path: &str) -> std::io::Result<Self> {
        let cache = Self::new(name, Some(path.to_string()));
        if Path::new(path).exists() {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let map: HashMap<String, PersistedResponse> = serde_json::from_reader(reader)?;

            for (key, persisted) in map {
                match StoredResponse::try_from(persisted) {
                    Ok(response) => {
                        cache.inner.insert(key, response);
                    }
                    Err(e) => tracing::warn!(key = %key, error = %e, "Skipping unreadable cache entry"),
                }
            }
            metrics::record_cache_size(&cache.name, cache.inner.len());
            tracing::info!(cache = %cache.name, entries = cache.inner.len(), "Loaded cache from file");
        }
        Ok(cache)
    }

    /// Save to file, if a persistence path was configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);

            let map: HashMap<String, PersistedResponse> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), PersistedResponse::from(r.value())))
                .collect();

            serde_json::to_writer(writer, &map)?;
            tracing::info!(cache = %self.name, entries = map.len(), "Saved cache to file");
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn lookup(&self, key: &str) -> Option<StoredResponse> {
        let hit = self.inner.get(key).map(|r| r.value().clone());
        metrics::record_cache_lookup(&self.name, hit.is_some());
        hit
    }

    async fn put(&self, key: &str, response: StoredResponse) {
        self.inner.insert(key.to_string(), response);
        metrics::record_cache_size(&self.name, self.inner.len());
    }

    async fn delete(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        if removed {
            metrics::record_cache_size(&self.name, self.inner.len());
        }
        removed
    }

    async fn keys(&self) -> Vec<String> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }

    async fn len(&self) -> usize {
        self.inner.len()
    }
}
