//! HMAC-signed claim tokens carried as `Authorization: Bearer <token>`.
//!
//! Token layout is `header.payload.signature`, each part base64url without
//! padding. The signature is HMAC-SHA256 over `header.payload` with the
//! configured secret. The algorithm is fixed here; the token's own header is
//! never consulted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::Mac;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::security::signature::keyed_mac;

const TOKEN_HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Error)]
pub enum ClaimTokenError {
    #[error("authorization header is not a bearer token")]
    NotBearer,
    #[error("token must have three segments")]
    Segments,
    #[error("signature is not valid base64url")]
    SignatureEncoding,
    #[error("signature validation error")]
    BadSignature,
    #[error("payload is not valid base64url")]
    PayloadEncoding,
    #[error("payload is not a JSON object: {0}")]
    PayloadJson(#[from] serde_json::Error),
    #[error("claim {0:?} not found")]
    MissingClaim(String),
    #[error("claim {0:?} is empty")]
    EmptyClaim(String),
    #[error("claim value {0:?} is not accepted")]
    NotAccepted(String),
}

/// Verify `token` against `secret` and return its payload.
pub fn decode_verified(token: &str, secret: &[u8]) -> Result<Map<String, Value>, ClaimTokenError> {
    let mut parts = token.splitn(3, '.');
    let (header, payload, signature) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s)) => (h, p, s),
        _ => return Err(ClaimTokenError::Segments),
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| ClaimTokenError::SignatureEncoding)?;

    let mut mac = keyed_mac(secret);
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| ClaimTokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ClaimTokenError::PayloadEncoding)?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Authorize an `Authorization` header value.
///
/// Returns the matched claim value. A missing, non-string or empty claim
/// never authorizes, whatever `accepted` contains.
pub fn check_bearer(
    authorization: &str,
    secret: &[u8],
    claim: &str,
    accepted: &[String],
) -> Result<String, ClaimTokenError> {
    let token = match authorization.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => return Err(ClaimTokenError::NotBearer),
    };

    let payload = decode_verified(token, secret)?;
    let value = match payload.get(claim) {
        Some(Value::String(value)) => value,
        _ => return Err(ClaimTokenError::MissingClaim(claim.to_string())),
    };
    if value.is_empty() {
        return Err(ClaimTokenError::EmptyClaim(claim.to_string()));
    }
    if accepted.iter().any(|a| a == value) {
        Ok(value.clone())
    } else {
        Err(ClaimTokenError::NotAccepted(value.clone()))
    }
}

/// Claims of a token carrying `value` under `claim`, issued at `iat`
/// (unix seconds). The configured claim wins over `iat` if they share a name.
pub fn claim_payload(claim: &str, value: &str, iat: u64) -> Map<String, Value> {
    let mut claims = Map::new();
    claims.insert("iat".to_string(), Value::from(iat));
    claims.insert(claim.to_string(), Value::String(value.to_string()));
    claims
}

/// Sign `claims` into a token that [`decode_verified`] accepts.
pub fn issue(claims: &Map<String, Value>, secret: &[u8]) -> String {
    let header = URL_SAFE_NO_PAD.encode(TOKEN_HEADER_JSON);
    let payload = URL_SAFE_NO_PAD.encode(Value::Object(claims.clone()).to_string());

    let mut mac = keyed_mac(secret);
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{header}.{payload}.{signature}")
}
