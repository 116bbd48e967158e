//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Serve loop (http/server.rs), one iteration per cycle:
//!     snapshot config → begin_cycle (reload.rs) → serve until RestartTrigger fires
//!     → drain connections → pause → next cycle
//!
//! Restart triggers (restart.rs):
//!     /reload, SIGHUP, config mtime change, certificate mtime change
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → cancel root token → current cycle drains → loop exits
//! ```
//!
//! # Design Decisions
//! - One cancellation tree: process token → cycle tokens and watcher tokens
//! - Restarts are graceful; in-flight commands finish or time out first
//! - At most one autoreload watcher at a time

pub mod reload;
pub mod restart;
pub mod shutdown;
pub mod signals;

pub use reload::ReloadSupervisor;
pub use restart::{ReloadTrigger, RestartTrigger};
pub use shutdown::Shutdown;
