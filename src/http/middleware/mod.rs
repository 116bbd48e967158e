pub mod access_control;

pub use access_control::{access_control_middleware, RequestContext};
