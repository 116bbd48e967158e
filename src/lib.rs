//! Webhook-triggered command runner.
//!
//! Each configured route runs a shell command when called by an authorized
//! client, returning the command's output. Configuration is reloaded
//! without dropping in-flight requests.

// Core subsystems
pub mod config;
pub mod exec;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{ConfigStore, DeployerConfig};
pub use http::DeployerServer;
pub use lifecycle::Shutdown;
