//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, connection limit)
//!     → buffer into a CacheRequest (fetch::request)
//!     → lifecycle::ServiceWorker (route table of the active generation)
//!     → strategy answers from cache and/or origin
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer, ServerError, X_REQUEST_ID};
