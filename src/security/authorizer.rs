//! Request authorization across all configured schemes.
//!
//! Schemes are tried in a fixed order and the first applicable one decides:
//!
//! 1. shared token (only ever allows; a mismatch falls through)
//! 2. HMAC body signature
//! 3. bearer claim token
//! 4. source address whitelist
//!
//! Anything not allowed by the above is denied.

use std::fmt;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};

use crate::config::DeployerConfig;
use crate::security::jwt::{self, ClaimTokenError};
use crate::security::signature::{self, SIGNATURE_HEADER};
use crate::security::token;
use crate::security::whitelist::Whitelist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    SharedToken,
    BodySignature,
    ClaimToken,
    Whitelist,
}

#[derive(Debug)]
pub enum DenyReason {
    SignatureMismatch,
    ClaimToken(ClaimTokenError),
    NotWhitelisted,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::SignatureMismatch => "signature_mismatch",
            DenyReason::ClaimToken(_) => "claim_token",
            DenyReason::NotWhitelisted => "not_whitelisted",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::SignatureMismatch => write!(f, "body signature mismatch"),
            DenyReason::ClaimToken(e) => write!(f, "claim token rejected: {}", e),
            DenyReason::NotWhitelisted => write!(f, "address not whitelisted"),
        }
    }
}

#[derive(Debug)]
pub enum AuthDecision {
    Allow(AuthScheme),
    Deny(DenyReason),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow(_))
    }
}

/// Evaluates requests against one config snapshot.
pub struct Authorizer<'a> {
    config: &'a DeployerConfig,
}

impl<'a> Authorizer<'a> {
    pub fn new(config: &'a DeployerConfig) -> Self {
        Self { config }
    }

    /// Decide whether the request from `remote` (`ip:port`) may proceed.
    pub fn authorize(&self, remote: &str, headers: &HeaderMap, body: &[u8]) -> AuthDecision {
        let config = self.config;

        if token::token_matches(&config.gitlab_token, headers) {
            return AuthDecision::Allow(AuthScheme::SharedToken);
        }

        // Presence is decided on raw bytes; a non-ASCII value still counts.
        let signature = present(headers, SIGNATURE_HEADER);
        if let Some(signature) = signature.filter(|_| !config.github_secret.is_empty() && !body.is_empty()) {
            return if signature::verify_body(config.github_secret.as_bytes(), signature, body) {
                AuthDecision::Allow(AuthScheme::BodySignature)
            } else {
                AuthDecision::Deny(DenyReason::SignatureMismatch)
            };
        }

        let authorization = present(headers, AUTHORIZATION.as_str());
        if let Some(authorization) =
            authorization.filter(|_| !config.jwt_hmac.is_empty() && !config.jwt_claim.is_empty())
        {
            let checked = authorization
                .to_str()
                .map_err(|_| ClaimTokenError::NotBearer)
                .and_then(|value| {
                    jwt::check_bearer(
                        value,
                        config.jwt_hmac.as_bytes(),
                        &config.jwt_claim,
                        &config.jwt_claim_any,
                    )
                });
            return match checked {
                Ok(_) => AuthDecision::Allow(AuthScheme::ClaimToken),
                Err(e) => AuthDecision::Deny(DenyReason::ClaimToken(e)),
            };
        }

        if Whitelist::from_entries(&config.whitelist).allows(remote) {
            AuthDecision::Allow(AuthScheme::Whitelist)
        } else {
            AuthDecision::Deny(DenyReason::NotWhitelisted)
        }
    }
}

fn present<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h HeaderValue> {
    headers.get(name).filter(|v| !v.is_empty())
}
