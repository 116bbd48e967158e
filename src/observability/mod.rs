//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stdout or log file)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log file / journal
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Command output is logged line by line, tagged with the route name
//! - Request ID flows through the HTTP layer (x-request-id)
//! - Metrics are cheap no-ops unless an exporter is configured

pub mod logging;
pub mod metrics;
