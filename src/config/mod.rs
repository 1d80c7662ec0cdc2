//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → passed by value into the worker at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no global settings object
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, ListenerConfig, ObservabilityConfig, OriginConfig, PrecacheConfig, ProxyConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
