//! Request/response model and the network capability.
//!
//! # Data Flow
//! ```text
//! Incoming axum request
//!     → request.rs (buffer body, resolve against origin, classify destination)
//!     → [strategy decides network and/or cache]
//!     → client.rs (forward to origin, non-2xx = failure)
//!     → response.rs (buffered StoredResponse, shared by client and cache)
//! ```

pub mod client;
pub mod request;
pub mod response;

pub use client::{FetchError, Fetcher, HttpFetcher};
pub use request::{BufferError, CacheRequest, Credentials, Destination};
pub use response::StoredResponse;
