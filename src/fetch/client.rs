//! Network fetch capability.
//!
//! # Responsibilities
//! - Forward a `CacheRequest` to the origin
//! - Buffer the response body (bounded)
//! - Classify failures: connection, non-2xx, timeout
//!
//! # Design Decisions
//! - Non-2xx responses are failures; strategies never cache them
//! - Credentials are stripped here when the request says `omit`
//! - One shared hyper-util client, pooled per origin

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::fetch::request::CacheRequest;
use crate::fetch::response::{strip_hop_by_hop, StoredResponse};

/// Why a network fetch produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("connection failed: {0}")]
    Connect(String),

    /// The origin answered, but not with a 2xx. The response is kept so it
    /// can still be relayed when nothing better is available.
    #[error("origin answered with status {}", .0.status)]
    Status(Box<StoredResponse>),

    #[error("network timeout after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// The origin's own response, for failures that produced one.
    pub fn upstream_response(&self) -> Option<&StoredResponse> {
        match self {
            FetchError::Status(response) => Some(&**response),
            _ => None,
        }
    }
}

/// Something that can retrieve a response from the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, FetchError>;
}

/// Fetcher backed by a pooled HTTP/1.1 client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client<HttpConnector, Body>,
    timeout: Option<Duration>,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a new fetcher.
    pub fn new(connect_timeout: Duration, timeout: Option<Duration>, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            timeout,
            max_body_bytes,
        }
    }

    fn build_request(&self, request: &CacheRequest) -> Result<Request<Body>, FetchError> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(request.url.as_str());

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                headers.append(name.clone(), value.clone());
            }
            strip_hop_by_hop(headers);
            // The client derives Host from the origin URI.
            headers.remove(header::HOST);
            if !request.credentials.sends_credentials() {
                headers.remove(header::COOKIE);
                headers.remove(header::AUTHORIZATION);
            }
            // Cache keys ignore `Vary`, so cached bodies must be identity-encoded.
            if request.is_cacheable() {
                headers.remove(header::ACCEPT_ENCODING);
            }
        }

        builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))
    }

    async fn send(&self, request: Request<Body>) -> Result<StoredResponse, FetchError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| FetchError::Connect(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        let response = StoredResponse::new(parts.status, parts.headers, body);

        if !response.is_success() {
            return Err(FetchError::Status(Box::new(response)));
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, FetchError> {
        let outgoing = self.build_request(request)?;

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.send(outgoing))
                .await
                .unwrap_or(Err(FetchError::Timeout(limit))),
            None => self.send(outgoing).await,
        };

        match &result {
            Ok(response) => tracing::trace!(
                url = %request.url,
                status = %response.status,
                bytes = response.body.len(),
                "Fetched from network"
            ),
            Err(e) => tracing::debug!(url = %request.url, error = %e, "Network fetch failed"),
        }
        result
    }
}
