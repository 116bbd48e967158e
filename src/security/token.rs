//! Shared-token header check (`X-Gitlab-Token`).

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

pub const TOKEN_HEADER: &str = "x-gitlab-token";

/// True when a secret is configured and the request carries it verbatim.
pub fn token_matches(secret: &str, headers: &HeaderMap) -> bool {
    if secret.is_empty() {
        return false;
    }
    headers
        .get(TOKEN_HEADER)
        .map(|value| value.as_bytes().ct_eq(secret.as_bytes()).into())
        .unwrap_or(false)
}
