//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::DeployerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not unmarshal config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse, default and validate a config document.
pub fn parse_config(content: &str) -> Result<DeployerConfig, ConfigError> {
    let config: DeployerConfig = serde_json::from_str(content)?;
    let config = config.normalize();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<DeployerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
