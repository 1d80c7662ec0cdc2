//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::fetch::Credentials;
use crate::strategy::StrategyKind;

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Upstream origin serving the web application.
    pub origin: OriginConfig,

    /// Runtime cache and strategy selection.
    pub cache: CacheConfig,

    /// Precache manifest settings.
    pub precache: PrecacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL of the origin (e.g., "http://127.0.0.1:3000/").
    /// Manifest entries and the fallback document resolve against it.
    pub url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Largest response body buffered from the origin.
    pub max_body_bytes: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000/".to_string(),
            connect_timeout_secs: 5,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Runtime cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache name, used in logs and as the persistence identity.
    pub name: String,

    /// Strategy applied to precached URLs.
    pub strategy: StrategyKind,

    /// Network timeout for the network-first strategy, 0 disables it.
    pub network_timeout_secs: u64,

    /// Credentials mode for precache requests.
    pub credentials: Credentials,

    /// Document served for failed navigations, relative to the origin.
    pub fallback: String,

    /// Log suppressed network failures and cache housekeeping.
    pub debug: bool,

    /// Optional JSON file the cache is loaded from and saved to.
    pub persist_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "runtime".to_string(),
            strategy: StrategyKind::NetworkFirst,
            network_timeout_secs: 0,
            credentials: Credentials::SameOrigin,
            fallback: "index.html".to_string(),
            debug: false,
            persist_path: None,
        }
    }
}

/// Precache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrecacheConfig {
    /// Path to the precache manifest (JSON). No manifest means no precaching.
    pub manifest_path: Option<String>,

    /// Reinstall when the manifest file changes.
    pub watch: bool,
}

impl Default for PrecacheConfig {
    fn default() -> Self {
        Self {
            manifest_path: None,
            watch: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
