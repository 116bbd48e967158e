//! Access control middleware.
//! Authorizes every request against the current config snapshot.

use std::error::Error as _;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use tracing::{debug, warn};

use crate::config::DeployerConfig;
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::{AuthDecision, AuthScheme, Authorizer};

/// Context attached to authorized requests.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Snapshot the request was authorized against.
    pub config: Arc<DeployerConfig>,
    pub scheme: AuthScheme,
}

pub async fn access_control_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let config = state.supervisor.store().snapshot();
    let (mut parts, body) = req.into_parts();

    // The signature check needs the raw body, so it is buffered up front.
    let body = match to_bytes(body, config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) if exceeds_limit(&e) => {
            warn!(peer = %peer, path = %parts.uri.path(), limit = config.max_body_bytes, "Request body too large");
            return response::body_too_large();
        }
        Err(e) => {
            warn!(peer = %peer, path = %parts.uri.path(), error = %e, "Failed to read request body");
            return response::bad_request();
        }
    };

    let remote = peer.to_string();
    match Authorizer::new(&config).authorize(&remote, &parts.headers, &body) {
        AuthDecision::Allow(scheme) => {
            debug!(peer = %remote, path = %parts.uri.path(), scheme = ?scheme, "Request authorized");
            parts.extensions.insert(RequestContext { config, scheme });
            next.run(Request::from_parts(parts, Body::from(body))).await
        }
        AuthDecision::Deny(reason) => {
            warn!(peer = %remote, path = %parts.uri.path(), reason = %reason, "Access forbidden");
            metrics::record_auth_denied(reason.as_str());
            response::forbidden()
        }
    }
}

/// Whether a body read failed because it crossed the size cap.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
