//! Response cache subsystem.
//!
//! # Design Decisions
//! - Strategies depend on the `CacheStore` trait, not the concrete map
//! - One named cache per process, shared via `Arc`
//! - Persistence is a snapshot: loaded at startup, saved at shutdown

pub mod memory;
pub mod store;

pub use memory::MemoryCache;
pub use store::CacheStore;
