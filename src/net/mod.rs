//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! --listen flag
//!     → listener.rs (parse address, bind per serving cycle)
//!     → tls.rs (optional: load PEM material into rustls)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The socket is rebound on every serving cycle, after the previous one
//!   has fully drained
//! - TLS is used only when both certificate and key are configured

pub mod listener;
pub mod tls;

pub use listener::{parse_listen_addr, ListenerError};
