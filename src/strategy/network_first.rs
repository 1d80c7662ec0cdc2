//! Network-first strategy.
//!
//! # Behavior
//! - Fetch from the network, caching successful responses
//! - On network failure, serve the cached copy if there is one
//! - With a network timeout, serve the cached copy once the timeout
//!   elapses; on a miss keep waiting for the network
//!
//! The network fetch runs in its own task so a timed-out fetch can still
//! complete and refresh the cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinHandle};

use crate::cache::CacheStore;
use crate::fetch::{CacheRequest, FetchError, Fetcher, StoredResponse};
use crate::strategy::{fetch_and_cache_put, Strategy, StrategyError};

pub struct NetworkFirst {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
    network_timeout: Option<Duration>,
}

impl NetworkFirst {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn CacheStore>,
        network_timeout: Option<Duration>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            network_timeout,
        }
    }

    fn spawn_network(&self, request: &CacheRequest) -> JoinHandle<Result<StoredResponse, FetchError>> {
        let fetcher = self.fetcher.clone();
        let cache = self.cache.clone();
        let request = request.clone();
        tokio::spawn(async move { fetch_and_cache_put(fetcher.as_ref(), cache.as_ref(), &request).await })
    }

    async fn settle(
        &self,
        request: &CacheRequest,
        joined: Result<Result<StoredResponse, FetchError>, JoinError>,
    ) -> Result<StoredResponse, StrategyError> {
        match joined {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => match self.cache.lookup(&request.cache_key()).await {
                Some(hit) => {
                    tracing::debug!(url = %request.url, error = %e, "Network failed, serving from cache");
                    Ok(hit)
                }
                None => Err(StrategyError::Network(e)),
            },
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "Network task failed");
                Err(StrategyError::Aborted)
            }
        }
    }
}

#[async_trait]
impl Strategy for NetworkFirst {
    fn name(&self) -> &'static str {
        "network-first"
    }

    async fn handle(&self, request: &CacheRequest) -> Result<StoredResponse, StrategyError> {
        let mut network = self.spawn_network(request);

        let Some(limit) = self.network_timeout else {
            return self.settle(request, network.await).await;
        };

        match tokio::time::timeout(limit, &mut network).await {
            Ok(joined) => self.settle(request, joined).await,
            Err(_) => {
                if let Some(hit) = self.cache.lookup(&request.cache_key()).await {
                    tracing::debug!(url = %request.url, timeout = ?limit, "Network timed out, serving from cache");
                    return Ok(hit);
                }
                self.settle(request, network.await).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::*;

    #[tokio::test]
    async fn test_network_success_updates_cache() {
        let store = cache();
        let req = request("/index.html");
        store.put(&req.cache_key(), StoredResponse::ok("old")).await;

        let strategy = NetworkFirst::new(ScriptedFetcher::ok("new", 0), store.clone(), None);
        assert_eq!(strategy.handle(&req).await.unwrap().body, "new");
        assert_eq!(store.lookup(&req.cache_key()).await.unwrap().body, "new");
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_to_cache() {
        let store = cache();
        let req = request("/index.html");
        store.put(&req.cache_key(), StoredResponse::ok("old")).await;

        let strategy = NetworkFirst::new(ScriptedFetcher::failing(0), store, None);
        assert_eq!(strategy.handle(&req).await.unwrap().body, "old");
    }

    #[tokio::test]
    async fn test_failure_and_miss_is_network_error() {
        let strategy = NetworkFirst::new(ScriptedFetcher::failing(0), cache(), None);
        let err = strategy.handle(&request("/index.html")).await.unwrap_err();
        assert_eq!(err, StrategyError::Network(FetchError::Connect("offline".into())));
    }

    #[tokio::test]
    async fn test_timeout_serves_cache_and_still_refreshes() {
        let store = cache();
        let req = request("/index.html");
        store.put(&req.cache_key(), StoredResponse::ok("old")).await;

        let strategy = NetworkFirst::new(
            ScriptedFetcher::ok("new", 200),
            store.clone(),
            Some(Duration::from_millis(20)),
        );
        assert_eq!(strategy.handle(&req).await.unwrap().body, "old");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.lookup(&req.cache_key()).await.unwrap().body, "new");
    }

    #[tokio::test]
    async fn test_timeout_with_miss_waits_for_network() {
        let strategy = NetworkFirst::new(
            ScriptedFetcher::ok("slow", 100),
            cache(),
            Some(Duration::from_millis(10)),
        );
        assert_eq!(strategy.handle(&request("/index.html")).await.unwrap().body, "slow");
    }
}
