//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sw_requests_total` (counter): requests by strategy, outcome
//! - `sw_request_duration_seconds` (histogram): latency by strategy
//! - `sw_cache_lookups_total` (counter): lookups by cache, hit/miss
//! - `sw_cache_entries` (gauge): entries per cache
//! - `sw_precache_installs_total` (counter): installs by result
//! - `sw_precache_evictions_total` (counter): entries removed on activation
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(strategy: &'static str, outcome: &'static str, start: Instant) {
    counter!("sw_requests_total", "strategy" => strategy, "outcome" => outcome).increment(1);
    histogram!("sw_request_duration_seconds", "strategy" => strategy)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(cache: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("sw_cache_lookups_total", "cache" => cache.to_string(), "result" => result).increment(1);
}

pub fn record_cache_size(cache: &str, entries: usize) {
    gauge!("sw_cache_entries", "cache" => cache.to_string()).set(entries as f64);
}

pub fn record_install(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("sw_precache_installs_total", "result" => result).increment(1);
}

pub fn record_evictions(count: usize) {
    counter!("sw_precache_evictions_total").increment(count as u64);
}
