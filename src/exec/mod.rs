//! Command execution subsystem.
//!
//! # Data Flow
//! ```text
//! route handler
//!     → Job (command, stdin, POST_* env, timeout)
//!     → runner.rs (sh -c, timeout race, forced kill)
//!     → output.rs (tee to log + response body)
//!     → Result<ExecReport, ExecError> → HTTP status
//! ```
//!
//! # Design Decisions
//! - One process per request, no queueing or retries
//! - No cap on concurrent executions; each request carries its own timeout

pub mod output;
pub mod runner;

pub use output::{OutputSink, RouteOutput};
pub use runner::{CommandExecutor, ExecError, ExecReport, Job};
