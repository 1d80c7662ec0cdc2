//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! CacheRequest (method, url, destination)
//!     → router.rs (route lookup, first match wins)
//!     → matcher.rs (evaluate match conditions)
//!     → matched route's strategy, or the default handler
//!     → on failure: catch handler (app shell for navigations)
//!
//! Route compilation (on every successful install):
//!     precache URLs
//!     → precache_matcher (GET + URL set)
//!     → configured strategy
//!     → frozen RouteTable, swapped in atomically
//! ```

pub mod matcher;
pub mod router;

pub use router::{Handled, Outcome, Route, RouteTable};
