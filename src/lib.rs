//! Keeps reverse-proxy upstream blocks in sync with scaling-group membership.

pub mod admin;
pub mod config;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;

pub use config::Config;
pub use events::EventDispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::ReconfigurationEngine;
