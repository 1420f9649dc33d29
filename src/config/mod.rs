//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → moved into the engine and dispatcher constructors at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; groups are fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, DEFAULT_CONFIG_PATH};
pub use schema::{
    AdminConfig, BackendLineConfig, Config, GroupConfig, ListenerConfig, ObservabilityConfig,
    ReloadConfig, ResolverConfig,
};
pub use validation::ValidationError;
