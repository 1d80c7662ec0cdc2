//! Manifest file watcher for reinstalls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::precache::manifest::Manifest;

/// A watcher that monitors the manifest file for changes.
pub struct ManifestWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Manifest>,
}

impl ManifestWatcher {
    /// Create a new ManifestWatcher.
    ///
    /// Returns the watcher and a receiver for parsed manifests.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Manifest>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file on notify's background thread.
    ///
    /// The returned watcher must be kept alive for events to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Manifest change detected, reloading");
                        match Manifest::load(&path) {
                            Ok(manifest) => {
                                let _ = tx.send(manifest);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload manifest, keeping current precache");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Manifest watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_change_delivers_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"["index.html"]"#).unwrap();

        let (watcher, mut updates) = ManifestWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        std::fs::write(&path, r#"["index.html", "app.js"]"#).unwrap();

        let manifest = tokio::time::timeout(Duration::from_secs(10), async {
            // Editors and the OS may report intermediate writes; wait for the full one.
            loop {
                let manifest = updates.recv().await.expect("watcher dropped");
                if manifest.len() == 2 {
                    break manifest;
                }
            }
        })
        .await
        .expect("no manifest update observed");

        assert_eq!(manifest.entries[1].url, "app.js");
    }
}
