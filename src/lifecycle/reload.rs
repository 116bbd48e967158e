//! Reload supervision.
//!
//! # State machine
//! ```text
//! Running --(reload event)--> Draining --(connections closed)--> Running (new config)
//! ```
//!
//! Reload events come from the `/reload` endpoint, SIGHUP and the
//! autoreload watcher. All of them end the current serving cycle through its
//! [`RestartTrigger`]; the serve loop then starts a new cycle from the
//! current snapshot.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, ConfigStore, ConfigWatcher, DeployerConfig};
use crate::lifecycle::restart::{ReloadTrigger, RestartTrigger};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

/// Delay between answering `/reload` and closing the listener.
pub const RELOAD_GRACE: Duration = Duration::from_secs(1);

pub struct ReloadSupervisor {
    store: Arc<ConfigStore>,
    shutdown: Shutdown,
    cycle: Mutex<Option<RestartTrigger>>,
    watcher: Mutex<Option<CancellationToken>>,
}

impl ReloadSupervisor {
    pub fn new(store: Arc<ConfigStore>, shutdown: Shutdown) -> Self {
        Self {
            store,
            shutdown,
            cycle: Mutex::new(None),
            watcher: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Open a new serving cycle and (re)start the watcher for it.
    pub fn begin_cycle(&self) -> RestartTrigger {
        let trigger = RestartTrigger::new(self.shutdown.child_token());
        *lock(&self.cycle) = Some(trigger.clone());

        let config = self.store.snapshot();
        if config.disable_autoreload {
            self.stop_watcher();
        } else {
            let watcher = ConfigWatcher::new(Arc::clone(&self.store), config.cert_path());
            self.start_watcher(watcher, trigger.clone());
        }
        trigger
    }

    /// Start `watcher`, cancelling any watcher that is still running.
    pub fn start_watcher(&self, watcher: ConfigWatcher, restart: RestartTrigger) {
        let token = self.shutdown.child_token();
        if let Some(previous) = lock(&self.watcher).replace(token.clone()) {
            previous.cancel();
        }
        tokio::spawn(watcher.run(token, restart));
    }

    pub fn stop_watcher(&self) {
        if let Some(previous) = lock(&self.watcher).take() {
            previous.cancel();
        }
    }

    /// Re-read the config and, on success, restart the current cycle.
    pub fn reload(&self, trigger: ReloadTrigger) -> Result<Arc<DeployerConfig>, ConfigError> {
        match self.store.reload() {
            Ok(config) => {
                metrics::record_reload(trigger, true);
                if let Some(cycle) = lock(&self.cycle).as_ref() {
                    match trigger {
                        ReloadTrigger::Endpoint => cycle.restart_after(RELOAD_GRACE, trigger),
                        _ => cycle.restart(trigger),
                    }
                }
                Ok(config)
            }
            Err(e) => {
                metrics::record_reload(trigger, false);
                tracing::error!(trigger = %trigger, error = %e, "Config reload failed");
                Err(e)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
