//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build worker → Install manifest → Start watcher → Accept traffic
//!
//! Generations (worker.rs):
//!     Manifest installed → activated → routes swapped atomically
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Persist cache → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod worker;

pub use shutdown::Shutdown;
pub use worker::{ActivationReport, ServiceWorker};
