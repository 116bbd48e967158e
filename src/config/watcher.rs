//! Polling watcher for config and certificate changes.
//!
//! Compares modification times once per interval. A config change is only
//! acted on if the new file loads; a certificate change always restarts the
//! server, since the TLS layer reads certificates only when it binds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::store::ConfigStore;
use crate::lifecycle::restart::{ReloadTrigger, RestartTrigger};
use crate::observability::metrics;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A watcher that monitors the config file and certificate for changes.
pub struct ConfigWatcher {
    store: Arc<ConfigStore>,
    cert_path: Option<PathBuf>,
    interval: Duration,
}

impl ConfigWatcher {
    pub fn new(store: Arc<ConfigStore>, cert_path: Option<PathBuf>) -> Self {
        Self {
            store,
            cert_path,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll until a change restarts the server or `cancel` fires.
    ///
    /// Cancellation is observed between polls, never in the middle of one.
    pub async fn run(self, cancel: CancellationToken, restart: RestartTrigger) {
        let config_path = self.store.path().to_path_buf();
        let mut config_mtime = modified(Some(&config_path)).await;
        let cert_mtime = modified(self.cert_path.as_deref()).await;

        tracing::debug!(
            config = %config_path.display(),
            cert = ?self.cert_path,
            "Config watcher started"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Config watcher cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let current = modified(Some(&config_path)).await;
            if current != config_mtime {
                config_mtime = current;
                tracing::info!("Detected config change");
                match self.store.reload() {
                    Ok(_) => {
                        metrics::record_reload(ReloadTrigger::ConfigChanged, true);
                        restart.restart(ReloadTrigger::ConfigChanged);
                        return;
                    }
                    Err(e) => {
                        metrics::record_reload(ReloadTrigger::ConfigChanged, false);
                        tracing::error!(error = %e, "Config reload failed, keeping current configuration");
                        continue;
                    }
                }
            }

            let current = modified(self.cert_path.as_deref()).await;
            if current != cert_mtime {
                tracing::info!("Detected certificate change");
                metrics::record_reload(ReloadTrigger::CertificateChanged, true);
                restart.restart(ReloadTrigger::CertificateChanged);
                return;
            }
        }
    }
}

async fn modified(path: Option<&Path>) -> Option<SystemTime> {
    let path = path?;
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot stat watched file");
            None
        }
    }
}
