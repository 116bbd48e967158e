//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (router for the current cycle, request ID, tracing)
//!     → middleware/access_control.rs (buffer body, authorize)
//!     → handlers.rs (run the route's command or reload)
//!     → request.rs (stdin and POST_* env from the request)
//!     → response.rs (status and body from the outcome)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, DeployerServer, ServerError};
