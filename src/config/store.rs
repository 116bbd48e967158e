//! Swappable configuration snapshot.
//!
//! Handlers call [`ConfigStore::snapshot`] once at request start and work on
//! that `Arc` for the rest of the request. Reloads build a complete new
//! config off to the side and publish it with a single pointer swap, so a
//! reader sees either the old or the new config, never a mix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::DeployerConfig;

pub struct ConfigStore {
    path: PathBuf,
    current: ArcSwap<DeployerConfig>,
}

impl ConfigStore {
    /// Load the initial config. Failing here is fatal for the process.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = load_config(&path)?;
        Ok(Self::with_config(path, config))
    }

    /// Build a store around an already-loaded config.
    pub fn with_config(path: impl Into<PathBuf>, config: DeployerConfig) -> Self {
        Self {
            path: path.into(),
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<DeployerConfig> {
        self.current.load_full()
    }

    /// Re-read the config file. On error the active snapshot is untouched.
    pub fn reload(&self) -> Result<Arc<DeployerConfig>, ConfigError> {
        let config = Arc::new(load_config(&self.path)?);
        let previous = self.current.swap(Arc::clone(&config));

        if previous.log != config.log {
            tracing::warn!(
                old = %previous.log,
                new = %config.log,
                "Log file change takes effect after process restart"
            );
        }
        tracing::info!(routes = config.commands.len(), "Config reloaded ok");
        Ok(config)
    }
}
