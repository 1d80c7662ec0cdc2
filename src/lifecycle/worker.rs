//! Worker generations.
//!
//! # States
//! - Passthrough: nothing installed yet, every request goes to the network
//! - Active: a manifest is installed and its routes serve requests
//!
//! # Transitions
//! ```text
//! Passthrough → Active:  install + activate succeed
//! Active → Active':      a changed manifest installs and activates
//! any → (unchanged):     install fails; the current generation stays
//! ```
//!
//! A successfully installed generation takes over immediately, there is
//! no waiting phase.

use std::sync::Arc;

use arc_swap::ArcSwap;
use url::Url;

use crate::cache::{CacheStore, MemoryCache};
use crate::config::ProxyConfig;
use crate::fetch::request::cache_key_for;
use crate::fetch::{CacheRequest, Credentials, Fetcher};
use crate::precache::{self, Manifest, PrecacheError};
use crate::routing::matcher::precache_matcher;
use crate::routing::{Handled, Route, RouteTable};
use crate::strategy::{build_strategy, NetworkOnly};

/// The routes and manifest currently serving traffic.
pub struct Generation {
    pub manifest: Option<Manifest>,
    pub routes: RouteTable,
}

/// Summary of a successful install + activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub installed: usize,
    pub removed: usize,
}

/// Owns the cache, the network capability and the active generation.
pub struct ServiceWorker {
    config: ProxyConfig,
    origin: Url,
    fetcher: Arc<dyn Fetcher>,
    cache: MemoryCache,
    current: ArcSwap<Generation>,
}

impl ServiceWorker {
    /// Create a worker in passthrough mode.
    pub fn new(
        config: ProxyConfig,
        origin: Url,
        fetcher: Arc<dyn Fetcher>,
        cache: MemoryCache,
    ) -> Self {
        let passthrough = Generation {
            manifest: None,
            routes: RouteTable::passthrough(fetcher.clone()),
        };
        Self {
            config,
            origin,
            fetcher,
            cache,
            current: ArcSwap::from_pointee(passthrough),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    /// The generation serving traffic right now.
    pub fn current(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    pub fn active_manifest(&self) -> Option<Manifest> {
        self.current.load().manifest.clone()
    }

    /// Answer one request with the active generation.
    pub async fn handle(&self, request: &CacheRequest) -> Handled {
        let generation = self.current();
        generation.routes.handle(request).await
    }

    /// Precache `manifest`, drop stale entries, and switch routing over to it.
    ///
    /// On error the previous generation keeps serving.
    pub async fn install_and_activate(&self, manifest: Manifest) -> Result<ActivationReport, PrecacheError> {
        let urls = manifest.resolve(&self.origin)?;
        let credentials: Credentials = self.config.cache.credentials;

        let installed =
            precache::install(self.fetcher.as_ref(), &self.cache, &urls, credentials).await?;
        let removed = precache::activate(&self.cache, &urls, self.config.cache.debug).await;

        let routes = self.build_routes(&urls)?;
        self.current.store(Arc::new(Generation {
            manifest: Some(manifest),
            routes,
        }));

        tracing::info!(
            cache = %self.cache.name(),
            installed,
            removed,
            strategy = ?self.config.cache.strategy,
            "Worker activated"
        );
        Ok(ActivationReport { installed, removed })
    }

    fn build_routes(&self, urls: &[Url]) -> Result<RouteTable, PrecacheError> {
        let cache: Arc<dyn CacheStore> = Arc::new(self.cache.clone());
        let strategy = build_strategy(&self.config.cache, self.fetcher.clone(), cache.clone());

        let fallback = self
            .origin
            .join(&self.config.cache.fallback)
            .map_err(|source| PrecacheError::InvalidUrl {
                url: self.config.cache.fallback.clone(),
                source,
            })?;

        Ok(RouteTable::new(Arc::new(NetworkOnly::new(self.fetcher.clone())))
            .with_route(Route::new("precache", precache_matcher(urls), strategy))
            .with_fallback(cache_key_for(&fallback), cache))
    }

    /// Save the cache, if persistence is configured.
    pub fn persist(&self) -> std::io::Result<()> {
        self.cache.save_to_file()
    }
}
