//! Cache-first strategy.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::fetch::{CacheRequest, Fetcher, StoredResponse};
use crate::strategy::{fetch_and_cache_put, Strategy, StrategyError};

/// Serve from the cache; on a miss, fetch and populate it.
pub struct CacheFirst {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
}

impl CacheFirst {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn CacheStore>) -> Self {
        Self { fetcher, cache }
    }
}

#[async_trait]
impl Strategy for CacheFirst {
    fn name(&self) -> &'static str {
        "cache-first"
    }

    async fn handle(&self, request: &CacheRequest) -> Result<StoredResponse, StrategyError> {
        if let Some(hit) = self.cache.lookup(&request.cache_key()).await {
            return Ok(hit);
        }
        Ok(fetch_and_cache_put(self.fetcher.as_ref(), self.cache.as_ref(), request).await?)
    }
}
