//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every engine step logs group and member as structured fields
//! - Request ID flows from the HTTP layer into handler spans
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
