//! Configuration schema definitions.
//!
//! The deployer is configured from a single JSON object. Every field is
//! optional; unknown fields are ignored so newer config files keep working
//! with older binaries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Command timeout applied when the config leaves `timeout` unset or zero.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Request body cap applied when `max_body_bytes` is unset or zero.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Response output cap applied when `max_output_bytes` is unset or zero.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Root configuration for the deployer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeployerConfig {
    /// Path to the TLS certificate (PEM).
    pub cert: String,

    /// Path to the TLS private key (PEM).
    pub key: String,

    /// Log file path. Empty means stdout.
    pub log: String,

    /// Route name to shell command.
    pub commands: HashMap<String, String>,

    /// IP literals or CIDR blocks allowed without credentials.
    pub whitelist: Vec<String>,

    /// Command timeout in seconds.
    pub timeout: u64,

    /// Disable the config/certificate mtime watcher.
    pub disable_autoreload: bool,

    /// Shared secret compared against `X-Gitlab-Token`.
    pub gitlab_token: String,

    /// HMAC secret for `X-Hub-Signature-256` body signatures.
    pub github_secret: String,

    /// Verification secret for bearer claim tokens.
    pub jwt_hmac: String,

    /// Claim inspected in bearer claim tokens.
    pub jwt_claim: String,

    /// Acceptable values of `jwt_claim`.
    pub jwt_claim_any: Vec<String>,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Maximum command output returned in a response body, in bytes.
    /// The log still receives everything.
    pub max_output_bytes: usize,

    /// Bind address of the Prometheus exporter, if any.
    pub metrics_address: Option<String>,
}

impl DeployerConfig {
    /// Fill in defaults for zero-valued fields.
    pub fn normalize(mut self) -> Self {
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_SECS;
        }
        if self.max_body_bytes == 0 {
            self.max_body_bytes = DEFAULT_MAX_BODY_BYTES;
        }
        if self.max_output_bytes == 0 {
            self.max_output_bytes = DEFAULT_MAX_OUTPUT_BYTES;
        }
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Certificate and key paths, only when both are configured.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        if self.cert.is_empty() || self.key.is_empty() {
            return None;
        }
        Some((PathBuf::from(&self.cert), PathBuf::from(&self.key)))
    }

    /// Certificate path watched for changes.
    pub fn cert_path(&self) -> Option<PathBuf> {
        (!self.cert.is_empty()).then(|| PathBuf::from(&self.cert))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        (!self.log.is_empty()).then(|| PathBuf::from(&self.log))
    }
}
