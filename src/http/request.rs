//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client did not send one
//! - Turn form submissions into `POST_<field>` environment variables

use std::collections::BTreeMap;

use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const ENV_PREFIX: &str = "POST_";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdGenerator;

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Environment variables for a form POST, one per field, first value wins.
///
/// Non-POST requests and non-form bodies yield nothing. Fields whose name or
/// value cannot be placed in an environment are skipped.
pub fn form_env(method: &Method, headers: &HeaderMap, body: &[u8]) -> Vec<(String, String)> {
    if method != Method::POST || !is_form(headers) {
        return Vec::new();
    }

    let mut fields = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        if key.is_empty() || key.contains(['=', '\0']) || value.contains('\0') {
            tracing::debug!(field = %key, "Skipping form field unusable as env var");
            continue;
        }
        fields.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }

    fields
        .into_iter()
        .map(|(key, value)| (format!("{ENV_PREFIX}{key}"), value))
        .collect()
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn form_fields_become_env() {
        let env = form_env(&Method::POST, &form_headers(), b"KEY=value&ref=refs%2Fheads%2Fmain");
        assert_eq!(
            env,
            vec![
                ("POST_KEY".to_string(), "value".to_string()),
                ("POST_ref".to_string(), "refs/heads/main".to_string()),
            ]
        );
    }

    #[test]
    fn first_value_wins() {
        let env = form_env(&Method::POST, &form_headers(), b"a=1&a=2");
        assert_eq!(env, vec![("POST_a".to_string(), "1".to_string())]);
    }

    #[test]
    fn only_form_posts_count() {
        assert!(form_env(&Method::GET, &form_headers(), b"a=1").is_empty());

        let mut json = HeaderMap::new();
        json.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(form_env(&Method::POST, &json, b"a=1").is_empty());
    }

    #[test]
    fn unusable_names_are_skipped() {
        let env = form_env(&Method::POST, &form_headers(), b"a%3Db=1&=2&ok=3");
        assert_eq!(env, vec![("POST_ok".to_string(), "3".to_string())]);
    }

    #[test]
    fn request_ids_are_uuids() {
        let request = Request::new(());
        let id = RequestIdGenerator.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
