//! Cache/network race.
//!
//! Both sources are consulted at once and the first usable response wins,
//! whichever source it came from.
//!
//! # Data Flow
//! ```text
//!                 ┌── network task: fetch → cache put → Settled::Network ──┐
//! handle(req) ────┤                                                        ├──▶ mpsc ──▶ RaceState
//!                 └── cache task:   lookup            → Settled::Cache ────┘
//! ```
//!
//! # Design Decisions
//! - Paths are spawned tasks and are never cancelled; the network path must
//!   still write the cache after losing the race
//! - A cache miss is not a failure and never decides the race on its own
//! - Failure is reported only once both paths settled without a response,
//!   and it carries the network error
//! - No timeout: the call waits for whichever paths are still outstanding

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::cache::CacheStore;
use crate::fetch::{CacheRequest, FetchError, Fetcher, StoredResponse};
use crate::strategy::{fetch_and_cache_put, Strategy, StrategyError};

/// Outcome of one retrieval path.
#[derive(Debug)]
pub enum Settled {
    Network(Result<StoredResponse, FetchError>),
    Cache(Option<StoredResponse>),
}

/// What the caller should do after observing an outcome.
#[derive(Debug, PartialEq)]
pub enum Decision {
    Resolve(StoredResponse),
    Reject(FetchError),
    Wait,
}

/// Per-call race state.
#[derive(Debug, Default, PartialEq)]
pub enum RaceState {
    /// Neither path has settled.
    #[default]
    Pending,
    /// The network failed; only a cache hit can still save the call.
    AwaitingCache(FetchError),
    /// The cache missed; everything rides on the network.
    AwaitingNetwork,
    ResolvedBySuccess,
    Failed,
}

impl RaceState {
    /// Feed one settled path into the state machine.
    ///
    /// Returns `Resolve` or `Reject` at most once; outcomes that arrive after
    /// the race is decided are ignored.
    pub fn observe(&mut self, settled: Settled) -> Decision {
        let state = std::mem::take(self);
        let (next, decision) = match (state, settled) {
            (done @ (RaceState::ResolvedBySuccess | RaceState::Failed), _) => (done, Decision::Wait),

            (_, Settled::Network(Ok(response))) | (_, Settled::Cache(Some(response))) => {
                (RaceState::ResolvedBySuccess, Decision::Resolve(response))
            }

            (RaceState::Pending, Settled::Network(Err(e))) => (RaceState::AwaitingCache(e), Decision::Wait),
            (RaceState::Pending, Settled::Cache(None)) => (RaceState::AwaitingNetwork, Decision::Wait),

            (RaceState::AwaitingNetwork, Settled::Network(Err(e))) => (RaceState::Failed, Decision::Reject(e)),
            (RaceState::AwaitingCache(e), Settled::Cache(None)) => (RaceState::Failed, Decision::Reject(e)),

            // A path reporting twice changes nothing.
            (waiting, _) => (waiting, Decision::Wait),
        };
        *self = next;
        decision
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, RaceState::ResolvedBySuccess | RaceState::Failed)
    }
}

/// Strategy racing the network against the cache.
pub struct CacheNetworkRace {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
    debug: bool,
}

impl CacheNetworkRace {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn CacheStore>, debug: bool) -> Self {
        Self { fetcher, cache, debug }
    }

    fn spawn_paths(&self, request: &CacheRequest) -> mpsc::Receiver<Settled> {
        // Room for both outcomes, so a late sender never waits on a gone receiver.
        let (tx, rx) = mpsc::channel(2);

        let network_tx = tx.clone();
        let fetcher = self.fetcher.clone();
        let cache = self.cache.clone();
        let network_request = request.clone();
        tokio::spawn(async move {
            let outcome = fetch_and_cache_put(fetcher.as_ref(), cache.as_ref(), &network_request).await;
            let _ = network_tx.send(Settled::Network(outcome)).await;
        });

        let cache = self.cache.clone();
        let key = request.cache_key();
        tokio::spawn(async move {
            let hit = cache.lookup(&key).await;
            let _ = tx.send(Settled::Cache(hit)).await;
        });

        rx
    }

    fn log_suppressed(&self, request: &CacheRequest, error: &FetchError) {
        if self.debug {
            tracing::info!(url = %request.url, error = %error, "Cannot fetch resource");
        } else {
            tracing::trace!(url = %request.url, error = %error, "Cannot fetch resource");
        }
    }
}

#[async_trait]
impl Strategy for CacheNetworkRace {
    fn name(&self) -> &'static str {
        "race"
    }

    async fn handle(&self, request: &CacheRequest) -> Result<StoredResponse, StrategyError> {
        let mut settled_paths = self.spawn_paths(request);
        let mut state = RaceState::Pending;

        while let Some(settled) = settled_paths.recv().await {
            if let Settled::Network(Err(e)) = &settled {
                self.log_suppressed(request, e);
            }

            match state.observe(settled) {
                Decision::Resolve(response) => return Ok(response),
                Decision::Reject(e) => return Err(StrategyError::Network(e)),
                Decision::Wait => {}
            }
        }

        // Both senders dropped without deciding: a path panicked.
        tracing::error!(url = %request.url, state = ?state, "Race ended without an outcome");
        Err(StrategyError::Aborted)
    }
}
