//! Response construction.
//!
//! # Responsibilities
//! - Map a command outcome to 200 or 500 with the captured output as body
//! - Render reload results and access denials
//!
//! # Design Decisions
//! - Output is buffered so the status reflects the command's outcome
//! - The error text is appended after any output the command produced

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::config::{ConfigError, DeployerConfig};
use crate::exec::{ExecError, ExecReport, RouteOutput};

pub fn command_response(mut output: RouteOutput, result: Result<ExecReport, ExecError>) -> Response {
    let status = match result {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            output.append_message(&err.to_string());
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, output.into_body()).into_response()
}

/// Reload failures are reported in the body; the status stays 200.
pub fn reload_response(result: Result<Arc<DeployerConfig>, ConfigError>) -> Response {
    match result {
        Ok(_) => (StatusCode::OK, "reload ok").into_response(),
        Err(err) => (StatusCode::OK, format!("reload err: {}", err)).into_response(),
    }
}

pub fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "Forbidden").into_response()
}

pub fn body_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Bad request body").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::OutputSink;
    use std::io;
    use std::time::Duration;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn success_returns_output() {
        let mut output = RouteOutput::new("deploy");
        output.write(b"done\n");
        let report = ExecReport { output_bytes: 5, elapsed: Duration::from_millis(3) };

        let response = command_response(output, Ok(report));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "done\n");
    }

    #[tokio::test]
    async fn failure_appends_error() {
        let mut output = RouteOutput::new("deploy");
        output.write(b"partial\n");

        let response = command_response(output, Err(ExecError::Exit { code: 2 }));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "partial\nrun err code: 2");
    }

    #[tokio::test]
    async fn error_text_survives_truncation() {
        let mut output = RouteOutput::new("deploy").with_limit(4);
        output.write(b"abcdefgh");

        let response = command_response(output, Err(ExecError::Exit { code: 1 }));
        assert_eq!(
            body_text(response).await,
            "abcd\n[output truncated: 4 bytes omitted]\nrun err code: 1"
        );
    }

    #[tokio::test]
    async fn reload_errors_stay_200() {
        let err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let response = reload_response(Err(err));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.starts_with("reload err: "));

        let response = reload_response(Ok(Arc::new(DeployerConfig::default())));
        assert_eq!(body_text(response).await, "reload ok");
    }
}
