//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store routes (matcher + strategy), checked in insertion order
//! - Fall through to the default handler when nothing matches
//! - Catch strategy failures and answer navigations with the app shell
//!
//! # Design Decisions
//! - Immutable after construction; a new table is swapped in on reinstall
//! - First match wins
//! - The catch handler never touches the network

use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::cache::CacheStore;
use crate::fetch::{CacheRequest, Destination, Fetcher, StoredResponse};
use crate::routing::matcher::Matcher;
use crate::strategy::{NetworkOnly, Strategy, StrategyError};

/// A single route: requests matching `matcher` go to `strategy`.
pub struct Route {
    pub name: String,
    pub matcher: Box<dyn Matcher>,
    pub strategy: Arc<dyn Strategy>,
}

impl Route {
    pub fn new(name: impl Into<String>, matcher: impl Matcher + 'static, strategy: Arc<dyn Strategy>) -> Self {
        Self {
            name: name.into(),
            matcher: Box::new(matcher),
            strategy,
        }
    }
}

/// Cached document served when a navigation cannot be answered.
struct Fallback {
    key: String,
    cache: Arc<dyn CacheStore>,
}

/// How a request ended up being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The strategy produced a response.
    Served,
    /// The strategy failed and the fallback document was served.
    Fallback,
    /// The strategy failed; the origin's error response was relayed.
    Relayed,
    /// Nothing usable; the network-error response was served.
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Served => "served",
            Outcome::Fallback => "fallback",
            Outcome::Relayed => "relayed",
            Outcome::Failed => "failed",
        }
    }
}

/// Result of dispatching one request.
pub struct Handled {
    pub route: String,
    pub strategy: &'static str,
    pub outcome: Outcome,
    pub response: Response,
}

/// Compiled routing table.
pub struct RouteTable {
    routes: Vec<Route>,
    default: Arc<dyn Strategy>,
    fallback: Option<Fallback>,
}

impl RouteTable {
    pub fn new(default: Arc<dyn Strategy>) -> Self {
        Self {
            routes: Vec::new(),
            default,
            fallback: None,
        }
    }

    /// A table that sends everything straight to the network.
    pub fn passthrough(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(Arc::new(NetworkOnly::new(fetcher)))
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Serve `key` from `cache` when a navigation fails.
    pub fn with_fallback(mut self, key: impl Into<String>, cache: Arc<dyn CacheStore>) -> Self {
        self.fallback = Some(Fallback {
            key: key.into(),
            cache,
        });
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Find the route for a request, or `None` for the default handler.
    pub fn match_request(&self, req: &CacheRequest) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(req))
    }

    /// Dispatch a request and turn the result into a response.
    pub async fn handle(&self, req: &CacheRequest) -> Handled {
        let (route, strategy) = match self.match_request(req) {
            Some(route) => (route.name.clone(), &route.strategy),
            None => ("default".to_string(), &self.default),
        };

        let (outcome, response) = match strategy.handle(req).await {
            Ok(response) => (Outcome::Served, response.into_response()),
            Err(e) => self.catch(req, e).await,
        };

        Handled {
            route,
            strategy: strategy.name(),
            outcome,
            response,
        }
    }

    async fn catch(&self, req: &CacheRequest, error: StrategyError) -> (Outcome, Response) {
        tracing::debug!(url = %req.url, error = %error, destination = ?req.destination, "Strategy failed");

        if req.destination == Destination::Document {
            if let Some(fallback) = &self.fallback {
                if let Some(hit) = fallback.cache.lookup(&fallback.key).await {
                    return (Outcome::Fallback, hit.into_response());
                }
            }
        }

        match error {
            StrategyError::Network(e) => match e.upstream_response() {
                Some(upstream) => (Outcome::Relayed, upstream.clone().into_response()),
                None => (Outcome::Failed, StoredResponse::error()),
            },
            StrategyError::Aborted => (Outcome::Failed, StoredResponse::error()),
        }
    }
}
