//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (body buffered by the access-control middleware):
//!     → authorizer.rs (priority-ordered scheme selection)
//!         → token.rs      shared token header
//!         → signature.rs  HMAC-SHA256 body signature
//!         → jwt.rs        bearer claim token
//!         → whitelist.rs  source IP / CIDR
//!     → Allow: pass to handler / Deny: 403
//! ```
//!
//! # Design Decisions
//! - Fail closed: no applicable scheme means deny
//! - Secrets are compared in constant time
//! - Deny reasons are logged, never returned to the client

pub mod authorizer;
pub mod jwt;
pub mod signature;
pub mod token;
pub mod whitelist;

pub use authorizer::{AuthDecision, AuthScheme, Authorizer, DenyReason};
