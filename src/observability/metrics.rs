//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deployer_requests_total` (counter): command requests by route, outcome
//! - `deployer_command_duration_seconds` (histogram): command wall time by route
//! - `deployer_auth_denied_total` (counter): rejected requests by reason
//! - `deployer_reloads_total` (counter): reload attempts by trigger, result
//! - `deployer_restarts_total` (counter): serving cycle restarts
//!
//! Without an installed exporter the macros are no-ops.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::restart::ReloadTrigger;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_command(route: &str, outcome: &'static str, elapsed: Duration) {
    counter!("deployer_requests_total", "route" => route.to_string(), "outcome" => outcome).increment(1);
    histogram!("deployer_command_duration_seconds", "route" => route.to_string()).record(elapsed.as_secs_f64());
}

pub fn record_auth_denied(reason: &'static str) {
    counter!("deployer_auth_denied_total", "reason" => reason).increment(1);
}

pub fn record_reload(trigger: ReloadTrigger, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("deployer_reloads_total", "trigger" => trigger.as_str(), "result" => result).increment(1);
}

pub fn record_restart() {
    counter!("deployer_restarts_total").increment(1);
}
