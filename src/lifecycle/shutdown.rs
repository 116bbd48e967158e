//! Process-wide shutdown coordination.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful process shutdown.
///
/// Every serving cycle and watcher hangs off a child token of this one, so
/// triggering it drains the current server and stops background tasks.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Token cancelled together with the process, or earlier on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
