//! Precache manifest.
//!
//! The manifest is the JSON list a build step injects into the worker:
//!
//! ```json
//! [
//!   { "url": "index.html", "revision": "3f2a" },
//!   { "url": "assets/app.4c1d.js", "revision": null },
//!   "favicon.ico"
//! ]
//! ```
//!
//! Entry URLs are resolved against the origin base URL.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::precache::PrecacheError;

/// One precache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub url: String,
    pub revision: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Url(String),
    Entry {
        url: String,
        #[serde(default)]
        revision: Option<String>,
    },
}

impl From<RawEntry> for ManifestEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Url(url) => ManifestEntry { url, revision: None },
            RawEntry::Entry { url, revision } => ManifestEntry { url, revision },
        }
    }
}

/// The set of assets to precache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parse manifest JSON.
    pub fn parse(json: &str) -> Result<Self, PrecacheError> {
        let raw: Vec<RawEntry> = serde_json::from_str(json)?;
        Ok(Self::new(raw.into_iter().map(ManifestEntry::from).collect()))
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, PrecacheError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Resolve every entry against `base`, dropping duplicates.
    pub fn resolve(&self, base: &Url) -> Result<Vec<Url>, PrecacheError> {
        let mut urls: Vec<Url> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let url = base.join(&entry.url).map_err(|source| PrecacheError::InvalidUrl {
                url: entry.url.clone(),
                source,
            })?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
