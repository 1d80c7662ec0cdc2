//! Network-only strategy; the default handler for unrouted requests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::fetch::{CacheRequest, Fetcher, StoredResponse};
use crate::strategy::{Strategy, StrategyError};

pub struct NetworkOnly {
    fetcher: Arc<dyn Fetcher>,
}

impl NetworkOnly {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Strategy for NetworkOnly {
    fn name(&self) -> &'static str {
        "network-only"
    }

    async fn handle(&self, request: &CacheRequest) -> Result<StoredResponse, StrategyError> {
        Ok(self.fetcher.fetch(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::*;

    #[tokio::test]
    async fn test_passes_network_result_through() {
        let strategy = NetworkOnly::new(ScriptedFetcher::ok("live", 0));
        let response = strategy.handle(&request("/api/status")).await.unwrap();
        assert_eq!(response.body, "live");

        let strategy = NetworkOnly::new(ScriptedFetcher::failing(0));
        let err = strategy.handle(&request("/api/status")).await.unwrap_err();
        assert!(matches!(err, StrategyError::Network(_)));
    }
}
