//! OS signal handling.
//!
//! - SIGINT / SIGTERM trigger graceful process shutdown
//! - SIGHUP re-reads the config and restarts the server, like `/reload`

use std::sync::Arc;

use crate::lifecycle::reload::ReloadSupervisor;
use crate::lifecycle::restart::ReloadTrigger;

/// Translate signals into shutdown and reload actions until shutdown.
pub async fn listen(supervisor: Arc<ReloadSupervisor>) {
    wait_for_termination(&supervisor).await;
    tracing::info!("Shutdown signal received");
    supervisor.shutdown().trigger();
}

#[cfg(unix)]
async fn wait_for_termination(supervisor: &ReloadSupervisor) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Unix signal handlers unavailable, only Ctrl+C is handled");
            ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = ctrl_c() => return,
            _ = term.recv() => return,
            _ = hup.recv() => {
                tracing::info!("SIGHUP received, reloading config");
                // Errors are logged by the supervisor; the server keeps running.
                let _ = supervisor.reload(ReloadTrigger::Signal);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination(_supervisor: &ReloadSupervisor) {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
