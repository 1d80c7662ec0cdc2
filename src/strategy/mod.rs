//! Caching strategies.
//!
//! # Data Flow
//! ```text
//! Route matched → strategy selected at startup
//!     → network_only.rs  (network, never the cache)
//!     → network_first.rs (network, cache on failure or timeout)
//!     → cache_first.rs   (cache, network on miss)
//!     → race.rs          (both at once, first response wins)
//!     → StoredResponse or StrategyError
//! ```
//!
//! # Design Decisions
//! - Strategies own `Arc`s to their collaborators and hold no per-request state
//! - Every successful, complete (non-206) network response for a GET is written to the cache
//!   before it is returned (except network-only)
//! - Strategy selection is an explicit config value, not global state

pub mod cache_first;
pub mod network_first;
pub mod network_only;
pub mod race;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::fetch::{CacheRequest, FetchError, Fetcher, StoredResponse};

pub use cache_first::CacheFirst;
pub use network_first::NetworkFirst;
pub use network_only::NetworkOnly;
pub use race::CacheNetworkRace;

/// Why a strategy could not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("no response from network or cache: {0}")]
    Network(#[from] FetchError),

    #[error("retrieval task ended without an outcome")]
    Aborted,
}

/// A way of answering a request from the network and/or the cache.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    async fn handle(&self, request: &CacheRequest) -> Result<StoredResponse, StrategyError>;
}

/// Strategy selection as written in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    NetworkFirst,
    CacheFirst,
    NetworkOnly,
    Race,
}

/// Build the configured strategy.
pub fn build_strategy(
    config: &CacheConfig,
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
) -> Arc<dyn Strategy> {
    match config.strategy {
        StrategyKind::Race => Arc::new(CacheNetworkRace::new(fetcher, cache, config.debug)),
        StrategyKind::NetworkFirst => {
            let timeout = (config.network_timeout_secs > 0)
                .then(|| Duration::from_secs(config.network_timeout_secs));
            Arc::new(NetworkFirst::new(fetcher, cache, timeout))
        }
        StrategyKind::CacheFirst => Arc::new(CacheFirst::new(fetcher, cache)),
        StrategyKind::NetworkOnly => Arc::new(NetworkOnly::new(fetcher)),
    }
}

/// Fetch from the network and, on success, store the response under the
/// request's cache key before handing it back.
///
/// Partial content (206) is returned to the caller but never stored: the
/// key names the whole resource.
pub async fn fetch_and_cache_put(
    fetcher: &dyn Fetcher,
    cache: &dyn CacheStore,
    request: &CacheRequest,
) -> Result<StoredResponse, FetchError> {
    let response = fetcher.fetch(request).await?;
    if !request.is_cacheable() {
        return Ok(response);
    }
    if response.status == StatusCode::PARTIAL_CONTENT {
        tracing::debug!(url = %request.url, "Not caching partial response");
        return Ok(response);
    }
    cache.put(&request.cache_key(), response.clone()).await;
    Ok(response)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators shared by the strategy tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::MemoryCache;
    use crate::fetch::Credentials;

    /// Fetcher answering every request with a fixed outcome after a delay.
    pub struct ScriptedFetcher {
        pub delay: Duration,
        pub outcome: Result<StoredResponse, FetchError>,
        pub calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub fn ok(body: &'static str, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                outcome: Ok(StoredResponse::ok(body)),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                outcome: Err(FetchError::Connect("offline".into())),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, _request: &CacheRequest) -> Result<StoredResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    pub fn request(path: &str) -> CacheRequest {
        let url = url::Url::parse("http://localhost/").unwrap().join(path).unwrap();
        CacheRequest::get(url, Credentials::SameOrigin)
    }

    pub fn cache() -> Arc<MemoryCache> {
        Arc::new(MemoryCache::new("test", None))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_build_strategy_selects_kind() {
        let mut config = CacheConfig::default();
        let fetcher = ScriptedFetcher::ok("x", 0);

        assert_eq!(build_strategy(&config, fetcher.clone(), cache()).name(), "network-first");

        config.strategy = StrategyKind::Race;
        assert_eq!(build_strategy(&config, fetcher.clone(), cache()).name(), "race");

        config.strategy = StrategyKind::CacheFirst;
        assert_eq!(build_strategy(&config, fetcher.clone(), cache()).name(), "cache-first");

        config.strategy = StrategyKind::NetworkOnly;
        assert_eq!(build_strategy(&config, fetcher, cache()).name(), "network-only");
    }

    #[tokio::test]
    async fn test_fetch_and_cache_put_skips_non_get() {
        let fetcher = ScriptedFetcher::ok("created", 0);
        let store = cache();
        let mut req = request("/api/items");
        req.method = axum::http::Method::POST;

        let response = fetch_and_cache_put(fetcher.as_ref(), store.as_ref(), &req).await.unwrap();
        assert_eq!(response.body, "created");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_partial_content_does_not_replace_full_entry() {
        let fetcher = Arc::new(ScriptedFetcher {
            delay: Duration::ZERO,
            outcome: Ok(StoredResponse::new(
                StatusCode::PARTIAL_CONTENT,
                axum::http::HeaderMap::new(),
                "FULL",
            )),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let store = cache();
        let req = request("/video.mp4");
        store.put(&req.cache_key(), StoredResponse::ok("FULL-VIDEO-BYTES")).await;

        let response = fetch_and_cache_put(fetcher.as_ref(), store.as_ref(), &req).await.unwrap();
        assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.body, "FULL");

        let stored = store.lookup(&req.cache_key()).await.unwrap();
        assert_eq!(stored.status, StatusCode::OK);
        assert_eq!(stored.body, "FULL-VIDEO-BYTES");
    }
}
