//! Restart requests for a single serving cycle.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// What asked for the server to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// Authorized call to `/reload`.
    Endpoint,
    /// SIGHUP.
    Signal,
    /// Config file mtime changed.
    ConfigChanged,
    /// Certificate file mtime changed.
    CertificateChanged,
}

impl ReloadTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadTrigger::Endpoint => "endpoint",
            ReloadTrigger::Signal => "signal",
            ReloadTrigger::ConfigChanged => "config_changed",
            ReloadTrigger::CertificateChanged => "certificate_changed",
        }
    }
}

impl fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle that ends the current serving cycle with a graceful shutdown.
///
/// Cloned into the watcher and reload paths; the serve loop waits on
/// [`RestartTrigger::requested`]. Triggering more than once is harmless.
#[derive(Debug, Clone)]
pub struct RestartTrigger {
    token: CancellationToken,
}

impl RestartTrigger {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Request a restart now.
    pub fn restart(&self, reason: ReloadTrigger) {
        if !self.token.is_cancelled() {
            tracing::info!(reason = %reason, "Graceful restart requested");
            self.token.cancel();
        }
    }

    /// Request a restart once `delay` has passed, giving the current response
    /// time to flush before the listener closes.
    pub fn restart_after(&self, delay: Duration, reason: ReloadTrigger) {
        let trigger = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => trigger.restart(reason),
                _ = trigger.token.cancelled() => {}
            }
        });
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn requested(&self) {
        self.token.cancelled().await;
    }
}
