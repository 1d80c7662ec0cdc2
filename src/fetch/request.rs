//! Request descriptor handed to strategies.
//!
//! A `CacheRequest` is immutable once built and cheap to clone, so each
//! retrieval path of a strategy can own its copy.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request};
use serde::{Deserialize, Serialize};
use url::Url;

/// Whether credentials travel with an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Strip cookies and authorization.
    Omit,
    /// Send credentials; the origin is always same-origin for this proxy.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

impl Credentials {
    pub fn sends_credentials(self) -> bool {
        !matches!(self, Credentials::Omit)
    }
}

/// What the response is going to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A top-level navigation (HTML document).
    Document,
    Other,
}

impl Destination {
    /// Derive the destination from request headers.
    ///
    /// Prefers `Sec-Fetch-Dest`; without it, a GET accepting `text/html`
    /// is treated as a navigation.
    pub fn from_headers(method: &Method, headers: &HeaderMap) -> Self {
        if let Some(dest) = headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok()) {
            return if dest.eq_ignore_ascii_case("document") {
                Destination::Document
            } else {
                Destination::Other
            };
        }

        let accepts_html = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);

        if *method == Method::GET && accepts_html {
            Destination::Document
        } else {
            Destination::Other
        }
    }
}

/// Cache key for a URL: the URL without its fragment.
pub fn cache_key_for(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// A request as seen by the caching layer.
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub credentials: Credentials,
    pub destination: Destination,
}

impl CacheRequest {
    /// A plain GET with no headers, as issued during precaching.
    pub fn get(url: Url, credentials: Credentials) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            credentials,
            destination: Destination::Other,
        }
    }

    /// Build from an incoming proxied request, targeting `origin`.
    ///
    /// The body must already be buffered by the caller.
    pub fn from_incoming(request: Request<()>, body: Bytes, origin: &Url) -> Result<Self, BufferError> {
        let (parts, ()) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = origin
            .join(path_and_query.trim_start_matches('/'))
            .map_err(BufferError::Url)?;
        // A path like `/http://elsewhere/` would otherwise join as an absolute URL.
        if url.origin() != origin.origin() {
            return Err(BufferError::OutsideOrigin(url.to_string()));
        }
        let destination = Destination::from_headers(&parts.method, &parts.headers);

        Ok(Self {
            method: parts.method,
            url,
            headers: parts.headers,
            body,
            credentials: Credentials::SameOrigin,
            destination,
        })
    }

    /// Split an axum request into the head and its buffered body.
    pub async fn buffer(
        request: Request<Body>,
        limit: usize,
        origin: &Url,
    ) -> Result<Self, BufferError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| BufferError::Body(e.to_string()))?;
        Self::from_incoming(Request::from_parts(parts, ()), bytes, origin)
    }

    /// Cache key: the URL without its fragment.
    pub fn cache_key(&self) -> String {
        cache_key_for(&self.url)
    }

    /// Only GET requests are ever cached.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

/// Failure turning an incoming request into a `CacheRequest`.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("invalid request target: {0}")]
    Url(url::ParseError),
    #[error("request target `{0}` leaves the origin")]
    OutsideOrigin(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:3000/app/").unwrap()
    }

    #[test]
    fn test_from_incoming_joins_origin() {
        let req = Request::builder()
            .uri("/assets/logo.png?v=2")
            .body(())
            .unwrap();
        let req = CacheRequest::from_incoming(req, Bytes::new(), &origin()).unwrap();
        assert_eq!(req.url.as_str(), "http://127.0.0.1:3000/app/assets/logo.png?v=2");
        assert_eq!(req.destination, Destination::Other);
    }

    #[test]
    fn test_from_incoming_rejects_foreign_targets() {
        let req = Request::builder()
            .uri("/http://evil.example/steal")
            .body(())
            .unwrap();
        let err = CacheRequest::from_incoming(req, Bytes::new(), &origin()).unwrap_err();
        assert!(matches!(err, BufferError::OutsideOrigin(_)));
    }

    #[test]
    fn test_navigation_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert_eq!(Destination::from_headers(&Method::GET, &headers), Destination::Document);
        assert_eq!(Destination::from_headers(&Method::POST, &headers), Destination::Other);

        headers.insert("sec-fetch-dest", "image".parse().unwrap());
        assert_eq!(Destination::from_headers(&Method::GET, &headers), Destination::Other);

        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-dest", "document".parse().unwrap());
        assert_eq!(Destination::from_headers(&Method::GET, &headers), Destination::Document);
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        let req = CacheRequest::get(
            Url::parse("http://localhost/index.html#top").unwrap(),
            Credentials::Omit,
        );
        assert_eq!(req.cache_key(), "http://localhost/index.html");
        assert!(req.is_cacheable());
        assert!(!req.credentials.sends_credentials());
    }
}
