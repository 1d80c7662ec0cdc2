//! Install and activate steps.

use std::collections::HashSet;

use futures_util::future::try_join_all;
use url::Url;

use crate::cache::CacheStore;
use crate::fetch::request::cache_key_for;
use crate::fetch::{CacheRequest, Credentials, Fetcher};
use crate::observability::metrics;
use crate::precache::PrecacheError;

/// Fetch every URL and store them all, or store nothing.
///
/// Fetches run concurrently. The first failure aborts the install and the
/// cache is left untouched. Returns the number of entries stored.
pub async fn install(
    fetcher: &dyn Fetcher,
    cache: &dyn CacheStore,
    urls: &[Url],
    credentials: Credentials,
) -> Result<usize, PrecacheError> {
    let requests: Vec<CacheRequest> = urls
        .iter()
        .map(|url| CacheRequest::get(url.clone(), credentials))
        .collect();

    let fetched = try_join_all(requests.iter().map(|request| async move {
        fetcher
            .fetch(request)
            .await
            .map(|response| (request.cache_key(), response))
            .map_err(|source| PrecacheError::Fetch {
                url: request.url.to_string(),
                source,
            })
    }))
    .await;

    let fetched = match fetched {
        Ok(fetched) => fetched,
        Err(e) => {
            metrics::record_install(false);
            return Err(e);
        }
    };

    let stored = fetched.len();
    for (key, response) in fetched {
        cache.put(&key, response).await;
    }

    metrics::record_install(true);
    tracing::info!(entries = stored, "Precache installed");
    Ok(stored)
}

/// Remove every cache entry that is not in `urls`.
///
/// Returns the number of entries removed.
pub async fn activate(cache: &dyn CacheStore, urls: &[Url], debug: bool) -> usize {
    let keep: HashSet<String> = urls.iter().map(cache_key_for).collect();
    let mut removed = 0;

    for key in cache.keys().await {
        if debug {
            tracing::info!(key = %key, "Checking cache entry to be removed");
        }
        if keep.contains(&key) {
            continue;
        }

        if cache.delete(&key).await {
            removed += 1;
            if debug {
                tracing::info!(key = %key, "Precached data removed");
            }
        } else if debug {
            tracing::info!(key = %key, "No precache found");
        }
    }

    metrics::record_evictions(removed);
    if removed > 0 {
        tracing::info!(removed, "Stale cache entries removed on activation");
    }
    removed
}
