//! Buffered responses, as produced by the network and held by the cache.
//!
//! # Design Decisions
//! - Bodies are fully buffered so a response can be served and stored at once
//! - Hop-by-hop headers are stripped before a response is kept
//! - The "network error" response maps to 502 Bad Gateway

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Headers that describe a single connection and never get cached or forwarded.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// A complete response held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let mut headers = headers;
        strip_hop_by_hop(&mut headers);
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A 200 response with the given body and no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), body)
    }

    /// The response handed out when nothing usable could be produced.
    pub fn error() -> Response {
        (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl IntoResponse for StoredResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        // The body length is known, so any stale length header is replaced.
        response.headers_mut().remove(header::CONTENT_LENGTH);
        response
    }
}

/// Serializable form used when persisting the cache to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl From<&StoredResponse> for PersistedResponse {
    fn from(response: &StoredResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            headers: response
                .headers
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect(),
            body: response.body.to_vec(),
        }
    }
}

impl TryFrom<PersistedResponse> for StoredResponse {
    type Error = String;

    fn try_from(persisted: PersistedResponse) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(persisted.status).map_err(|e| e.to_string())?;
        let mut headers = HeaderMap::new();
        for (name, value) in persisted.headers {
            let name = HeaderName::try_from(name).map_err(|e| e.to_string())?;
            let value = HeaderValue::try_from(value).map_err(|e| e.to_string())?;
            headers.append(name, value);
        }
        Ok(StoredResponse::new(status, headers, persisted.body))
    }
}
