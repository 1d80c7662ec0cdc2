//! Precache subsystem.
//!
//! # Data Flow
//! ```text
//! manifest file (JSON)
//!     → manifest.rs (parse, resolve against origin)
//!     → install.rs::install  (fetch all, store all or nothing)
//!     → install.rs::activate (drop entries not in the manifest)
//!     → new RouteTable swapped in by the worker
//!
//! On manifest change:
//!     watcher.rs detects change
//!     → manifest.rs reloads
//!     → worker reinstalls; failures keep the current generation
//! ```

pub mod install;
pub mod manifest;
pub mod watcher;

use thiserror::Error;

use crate::fetch::FetchError;

pub use install::{activate, install};
pub use manifest::{Manifest, ManifestEntry};
pub use watcher::ManifestWatcher;

/// Errors raised while loading or installing a manifest.
#[derive(Debug, Error)]
pub enum PrecacheError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest entry `{url}` is not a valid URL: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to precache `{url}`: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
}
