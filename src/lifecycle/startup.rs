//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the precache manifest before traffic is accepted
//! - Start the manifest watcher and its reinstall loop
//!
//! # Design Decisions
//! - A failed first install is not fatal: the worker stays in passthrough
//! - Reinstalls happen one at a time, in the order changes were seen
//! - Unchanged manifests (same entries and revisions) are skipped

use std::path::Path;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::{broadcast, mpsc};

use crate::lifecycle::worker::ServiceWorker;
use crate::precache::{Manifest, ManifestWatcher};

/// Load the manifest at `path` and install it.
///
/// Returns whether a generation was activated.
pub async fn install_from_path(worker: &ServiceWorker, path: &Path) -> bool {
    let manifest = match Manifest::load(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to load precache manifest");
            return false;
        }
    };

    match worker.install_and_activate(manifest).await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "Precache install failed, serving from network only");
            false
        }
    }
}

/// Apply manifest updates until shutdown.
pub async fn reinstall_loop(
    worker: Arc<ServiceWorker>,
    mut updates: mpsc::UnboundedReceiver<Manifest>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(manifest) = update else { break };
                if worker.active_manifest().as_ref() == Some(&manifest) {
                    tracing::debug!("Manifest unchanged, skipping reinstall");
                    continue;
                }
                if let Err(e) = worker.install_and_activate(manifest).await {
                    tracing::error!(error = %e, "Reinstall failed, keeping current generation");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Reinstall loop received shutdown signal, exiting");
                break;
            }
        }
    }
}

/// Watch `path` and reinstall on change. Keep the returned watcher alive.
pub fn spawn_manifest_watcher(
    worker: Arc<ServiceWorker>,
    path: &Path,
    shutdown: broadcast::Receiver<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let (watcher, updates) = ManifestWatcher::new(path);
    let watcher = watcher.run()?;
    tokio::spawn(reinstall_loop(worker, updates, shutdown));
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::ProxyConfig;
    use crate::lifecycle::Shutdown;
    use crate::strategy::testing::*;
    use url::Url;

    fn worker() -> Arc<ServiceWorker> {
        Arc::new(ServiceWorker::new(
            ProxyConfig::default(),
            Url::parse("http://localhost/").unwrap(),
            ScriptedFetcher::ok("asset", 0),
            MemoryCache::new("runtime", None),
        ))
    }

    #[tokio::test]
    async fn test_install_from_missing_file_stays_passthrough() {
        let worker = worker();
        assert!(!install_from_path(&worker, Path::new("/no/such/manifest.json")).await);
        assert!(worker.active_manifest().is_none());
    }

    #[tokio::test]
    async fn test_reinstall_loop_applies_updates() {
        let worker = worker();
        let shutdown = Shutdown::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(reinstall_loop(worker.clone(), rx, shutdown.subscribe()));

        let manifest = Manifest::parse(r#"["index.html"]"#).unwrap();
        tx.send(manifest.clone()).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(worker.active_manifest(), Some(manifest));
    }
}
