//! Route handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    response::Response,
    Extension,
};
use tracing::{info, warn};

use crate::exec::{Job, RouteOutput};
use crate::http::middleware::RequestContext;
use crate::http::request::form_env;
use crate::http::response;
use crate::http::server::AppState;
use crate::lifecycle::ReloadTrigger;
use crate::observability::metrics;

/// A configured command route, fixed for the lifetime of one router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub command: String,
}

pub async fn run_command(
    State(state): State<AppState>,
    Extension(route): Extension<Arc<Route>>,
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let is_post = method == Method::POST;
    let job = Job {
        route: route.name.clone(),
        command: route.command.clone(),
        env: form_env(&method, &headers, &body),
        stdin: (is_post && !body.is_empty()).then_some(body),
        timeout: ctx.config.command_timeout(),
    };

    info!(route = %route.name, method = %method, scheme = ?ctx.scheme, "Running command");
    let started = Instant::now();
    let mut output = RouteOutput::new(route.name.as_str()).with_limit(ctx.config.max_output_bytes);
    let result = state.executor.execute(job, &mut output).await;

    let outcome = match &result {
        Ok(report) => {
            info!(
                route = %route.name,
                output_bytes = report.output_bytes,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Command finished"
            );
            "ok"
        }
        Err(e) => {
            warn!(route = %route.name, error = %e, "Command failed");
            e.kind()
        }
    };
    metrics::record_command(&route.name, outcome, started.elapsed());

    response::command_response(output, result)
}

pub async fn reload(State(state): State<AppState>) -> Response {
    response::reload_response(state.supervisor.reload(ReloadTrigger::Endpoint))
}
