//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID, connection limit)
//! - Install the precache manifest before accepting traffic
//! - Dispatch requests to the service worker
//! - Persist the cache on shutdown
//!
//! # Design Decisions
//! - Every path goes through one handler; routing happens in the worker
//! - Connection limit rejects with 503 instead of queueing
//! - Request IDs are generated if absent and echoed on the response

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::cache::MemoryCache;
use crate::config::ProxyConfig;
use crate::fetch::{BufferError, CacheRequest, Fetcher, HttpFetcher};
use crate::lifecycle::startup;
use crate::lifecycle::ServiceWorker;
use crate::observability::metrics;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Failure assembling or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid origin url `{url}`: {source}")]
    Origin {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to load cache: {0}")]
    Cache(#[source] std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<ServiceWorker>,
    pub max_body_bytes: usize,
    pub connection_limit: Arc<Semaphore>,
}

/// HTTP front end for the caching worker.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    worker: Arc<ServiceWorker>,
}

impl HttpServer {
    /// Create a server talking to the configured origin over HTTP.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        // Precache fetches run outside any request, so the fetcher carries
        // the request timeout itself.
        let fetcher = HttpFetcher::new(
            Duration::from_secs(config.origin.connect_timeout_secs),
            Some(Duration::from_secs(config.timeouts.request_secs)),
            config.origin.max_body_bytes,
        );

        let cache = match &config.cache.persist_path {
            Some(path) => MemoryCache::load_from_file(config.cache.name.clone(), path)
                .map_err(ServerError::Cache)?,
            None => MemoryCache::new(config.cache.name.clone(), None),
        };

        Self::with_parts(config, Arc::new(fetcher), cache)
    }

    /// Create a server from an explicit fetcher and cache.
    pub fn with_parts(
        config: ProxyConfig,
        fetcher: Arc<dyn Fetcher>,
        cache: MemoryCache,
    ) -> Result<Self, ServerError> {
        let origin = Url::parse(&config.origin.url).map_err(|source| ServerError::Origin {
            url: config.origin.url.clone(),
            source,
        })?;

        let worker = Arc::new(ServiceWorker::new(config.clone(), origin, fetcher, cache));
        let state = AppState {
            worker: worker.clone(),
            max_body_bytes: config.origin.max_body_bytes,
            connection_limit: Arc::new(Semaphore::new(config.listener.max_connections)),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            worker,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), limit_connections))
            .with_state(state)
            .layer(layers)
    }

    /// Run the server until `shutdown` fires.
    ///
    /// The precache manifest, if configured, is installed before the first
    /// request is accepted.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let watch_shutdown = shutdown.resubscribe();

        let _watcher = match &self.config.precache.manifest_path {
            Some(path) => {
                let path = PathBuf::from(path);
                startup::install_from_path(&self.worker, &path).await;
                if self.config.precache.watch {
                    match startup::spawn_manifest_watcher(self.worker.clone(), &path, watch_shutdown) {
                        Ok(watcher) => Some(watcher),
                        Err(e) => {
                            tracing::error!(path = ?path, error = %e, "Failed to watch manifest");
                            None
                        }
                    }
                } else {
                    None
                }
            }
            None => {
                tracing::info!("No precache manifest configured, running in passthrough mode");
                None
            }
        };

        tracing::info!(
            address = %addr,
            origin = %self.worker.origin(),
            strategy = ?self.config.cache.strategy,
            "HTTP server starting"
        );

        let app = self.router.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        if let Err(e) = self.worker.persist() {
            tracing::error!(error = %e, "Failed to persist cache");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn worker(&self) -> Arc<ServiceWorker> {
        self.worker.clone()
    }
}

async fn wait_for(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("HTTP server draining connections");
}

/// Reject with 503 once `max_connections` requests are in flight.
async fn limit_connections(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Ok(_permit) = state.connection_limit.clone().try_acquire_owned() else {
        tracing::warn!("Connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };
    next.run(request).await
}

/// Main proxy handler.
/// Buffers the request and lets the active worker generation answer it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let worker = &state.worker;
    let mut request = match CacheRequest::buffer(request, state.max_body_bytes, worker.origin()).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected request");
            let status = match &e {
                BufferError::Body(_) => StatusCode::PAYLOAD_TOO_LARGE,
                BufferError::Url(_) | BufferError::OutsideOrigin(_) => StatusCode::BAD_REQUEST,
            };
            return (status, e.to_string()).into_response();
        }
    };
    request.credentials = worker.config().cache.credentials;

    tracing::debug!(
        request_id = %request_id,
        method = %request.method,
        url = %request.url,
        destination = ?request.destination,
        "Handling request"
    );

    let handled = worker.handle(&request).await;
    metrics::record_request(handled.strategy, handled.outcome.as_str(), start);

    tracing::debug!(
        request_id = %request_id,
        route = %handled.route,
        strategy = handled.strategy,
        outcome = handled.outcome.as_str(),
        status = %handled.response.status(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request handled"
    );
    handled.response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_origin() {
        let mut config = ProxyConfig::default();
        config.origin.url = "not a url".to_string();
        assert!(matches!(HttpServer::new(config), Err(ServerError::Origin { .. })));
    }

    #[test]
    fn test_new_with_defaults() {
        let server = HttpServer::new(ProxyConfig::default()).unwrap();
        assert!(server.worker().active_manifest().is_none());
        assert_eq!(server.config().cache.name, "runtime");
    }
}
