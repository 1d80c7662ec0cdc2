//! Service-worker caching proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ service worker ──▶ route table
//!                                                           │
//!                          ┌────────────────────────────────┤
//!                          ▼                                ▼
//!                   precache route                   default route
//!               (configured strategy)                (network only)
//!                    │          │                          │
//!                    ▼          ▼                          ▼
//!                  cache ◀── origin fetch ◀────────────────┘
//!
//!     Cross-cutting: config, logging, metrics, lifecycle (install,
//!     activate, manifest watch, graceful shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sw_cache_proxy::config::validation::validate_config;
use sw_cache_proxy::config::{load_config, ConfigError, ProxyConfig};
use sw_cache_proxy::lifecycle::signals;
use sw_cache_proxy::observability::{logging, metrics};
use sw_cache_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "sw-cache-proxy")]
#[command(about = "Offline-first caching proxy in front of an HTTP origin", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    if cli.check {
        println!("Configuration OK");
        return Ok(());
    }

    logging::init(&config.observability.log_level);
    tracing::info!("sw-cache-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.url,
        strategy = ?config.cache.strategy,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::forward_signals(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
