//! Cache store capability.

use async_trait::async_trait;

use crate::fetch::StoredResponse;

/// A keyed response store.
///
/// Keys are request URLs without fragment (see `CacheRequest::cache_key`).
/// Every operation is idempotent from the caller's point of view.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a stored response. Absence is not an error.
    async fn lookup(&self, key: &str) -> Option<StoredResponse>;

    /// Store (or replace) the response for `key`.
    async fn put(&self, key: &str, response: StoredResponse);

    /// Remove `key`, returning whether anything was removed.
    async fn delete(&self, key: &str) -> bool;

    /// All keys currently stored.
    async fn keys(&self) -> Vec<String>;

    /// Number of stored entries.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
