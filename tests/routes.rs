//! Router-level tests: command execution and access control.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mini_deployer::exec::CommandExecutor;
use mini_deployer::security::{jwt, signature};
use serde_json::{json, Map, Value};
use tower::ServiceExt;

mod common;
use common::{get, post, TestApp};

const FORM: &str = "application/x-www-form-urlencoded";

fn local_app(commands: Value) -> TestApp {
    TestApp::new(json!({
        "commands": commands,
        "whitelist": ["127.0.0.1"],
        "disable_autoreload": true,
    }))
}

#[tokio::test]
async fn form_fields_reach_command_env() {
    let app = local_app(json!({ "env": "env" }));

    let (status, body) = app.send(post("/env", FORM, "KEY=value")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("POST_KEY=value"), "env output: {body}");
}

#[tokio::test]
async fn post_body_is_stdin() {
    let app = local_app(json!({ "cat": "cat" }));
    let payload = r#"{"ref":"refs/heads/main"}"#;

    let (status, body) = app.send(post("/cat", "application/json", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, payload);
}

#[tokio::test]
async fn silent_success_is_empty_200() {
    let app = local_app(json!({ "ok": "true" }));

    let (status, body) = app.send(get("/ok")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn failing_command_is_500_with_code() {
    let app = local_app(json!({ "fail": "echo building; exit 1" }));

    let (status, body) = app.send(get("/fail")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("building\n"));
    assert!(body.contains("run err code: 1"));
}

#[tokio::test]
async fn overlong_command_times_out() {
    let app = TestApp::new(json!({
        "commands": { "slow": "sleep 10" },
        "whitelist": ["127.0.0.1"],
        "timeout": 1,
        "disable_autoreload": true,
    }));

    let started = Instant::now();
    let (status, body) = app.send(get("/slow")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("timed out"), "body: {body}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn missing_shell_is_start_failure() {
    let app = TestApp::with_executor(
        json!({
            "commands": { "x": "true" },
            "whitelist": ["127.0.0.1"],
            "disable_autoreload": true,
        }),
        CommandExecutor::new().with_shell("/nonexistent/shell"),
    );

    let (status, body) = app.send(get("/x")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("run err"));
}

#[tokio::test]
async fn unlisted_peer_is_forbidden() {
    let app = TestApp::new(json!({
        "commands": { "x": "true" },
        "whitelist": ["10.0.0.0/8"],
        "disable_autoreload": true,
    }));

    let (status, body) = app.send(get("/x")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Forbidden");

    let (status, _) = app.send(get("/reload")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn whitelisted_network_is_allowed() {
    let app = TestApp::new(json!({
        "commands": { "x": "true" },
        "whitelist": ["127.0.0.0/8"],
        "disable_autoreload": true,
    }));

    let (status, _) = app.send(get("/x")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = local_app(json!({ "x": "true" }));

    let (status, _) = app.send(get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = local_app(json!({ "x": "true" }));

    let response = app.router().oneshot(get("/x")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/x")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = TestApp::new(json!({
        "commands": { "cat": "cat" },
        "whitelist": ["127.0.0.1"],
        "max_body_bytes": 16,
        "disable_autoreload": true,
    }));

    let (status, _) = app.send(post("/cat", "text/plain", "x".repeat(64))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn long_output_is_truncated_in_response() {
    let app = TestApp::new(json!({
        "commands": { "noisy": "printf 0123456789abcdef" },
        "whitelist": ["127.0.0.1"],
        "max_output_bytes": 10,
        "disable_autoreload": true,
    }));

    let (status, body) = app.send(get("/noisy")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0123456789\n[output truncated: 6 bytes omitted]\n");
}

#[tokio::test]
async fn shared_token_authorizes() {
    let app = TestApp::new(json!({
        "commands": { "x": "echo hi" },
        "gitlab_token": "s3cret",
        "disable_autoreload": true,
    }));

    let request = Request::builder()
        .uri("/x")
        .header("x-gitlab-token", "s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hi\n");

    let request = Request::builder()
        .uri("/x")
        .header("x-gitlab-token", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn body_signature_authorizes() {
    let app = TestApp::new(json!({
        "commands": { "hook": "cat" },
        "github_secret": "hook-secret",
        "whitelist": ["127.0.0.1"],
        "disable_autoreload": true,
    }));
    let payload = r#"{"action":"push"}"#;
    let signed = signature::sign_body(b"hook-secret", payload.as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/hook")
        .header("x-hub-signature-256", &signed)
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, payload);

    // A bad signature is decisive even for a whitelisted peer.
    let request = Request::builder()
        .method("POST")
        .uri("/hook")
        .header("x-hub-signature-256", &signed)
        .body(Body::from(r#"{"action":"delete"}"#))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn claim_token_authorizes() {
    let app = TestApp::new(json!({
        "commands": { "x": "true" },
        "jwt_hmac": "jwt-secret",
        "jwt_claim": "sub",
        "jwt_claim_any": ["ci", "ops"],
        "disable_autoreload": true,
    }));

    let bearer = |sub: &str| {
        let mut claims = Map::new();
        claims.insert("sub".into(), Value::from(sub));
        format!("Bearer {}", jwt::issue(&claims, b"jwt-secret"))
    };
    let request = |auth: String| {
        Request::builder()
            .uri("/x")
            .header("authorization", auth)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = app.send(request(bearer("ci"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(request(bearer("intruder"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(request("Bearer not.a.token".into())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
