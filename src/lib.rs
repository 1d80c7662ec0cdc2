//! Service-worker style caching proxy library.
//!
//! Sits in front of an HTTP origin and answers requests the way an
//! offline-first web app's worker would: precached assets from the cache,
//! everything else through a configurable strategy, navigations falling
//! back to a cached app shell when the network is gone.

// Core subsystems
pub mod cache;
pub mod config;
pub mod fetch;
pub mod http;
pub mod precache;
pub mod routing;
pub mod strategy;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::{ServiceWorker, Shutdown};
