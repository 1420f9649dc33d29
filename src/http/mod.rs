//! HTTP intake subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, body limit)
//!     → request.rs (request ID generation)
//!     → webhook.rs (body → event dispatcher → status + message)
//!     → admin router (/admin/*, when enabled)
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod webhook;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
