//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (parse & deserialize, apply defaults)
//!     → validation.rs (semantic checks)
//!     → DeployerConfig (validated, immutable)
//!     → store.rs (ArcSwap snapshot shared by all handlers)
//!
//! On reload (/reload, SIGHUP or watcher.rs):
//!     → loader.rs loads new config
//!     → atomic swap in store.rs
//!     → serving cycle restarts and reinstalls routes
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A failed reload never replaces a working config

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::DeployerConfig;
pub use store::ConfigStore;
pub use watcher::ConfigWatcher;
