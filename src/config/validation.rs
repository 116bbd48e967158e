//! Configuration validation.
//!
//! Serde handles syntax; this module rejects configs that parse but cannot be
//! served. All errors are collected so an operator sees every problem at once.

use std::fmt;

use crate::config::schema::DeployerConfig;

/// Path segment reserved for the reload endpoint.
pub const RESERVED_ROUTE: &str = "reload";

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyRouteName,
    ReservedRouteName(String),
    InvalidRouteName { name: String, reason: &'static str },
    EmptyCommand(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyRouteName => write!(f, "route name must not be empty"),
            ValidationError::ReservedRouteName(name) => {
                write!(f, "route name {:?} is reserved", name)
            }
            ValidationError::InvalidRouteName { name, reason } => {
                write!(f, "route name {:?} {}", name, reason)
            }
            ValidationError::EmptyCommand(name) => {
                write!(f, "route {:?} has an empty command", name)
            }
        }
    }
}

/// Check a parsed config, returning every problem found.
pub fn validate_config(config: &DeployerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, command) in &config.commands {
        if name.is_empty() {
            errors.push(ValidationError::EmptyRouteName);
            continue;
        }
        if name == RESERVED_ROUTE {
            errors.push(ValidationError::ReservedRouteName(name.clone()));
        } else if name.starts_with('/') {
            errors.push(ValidationError::InvalidRouteName {
                name: name.clone(),
                reason: "must not start with '/'",
            });
        } else if name.contains(['{', '}']) {
            errors.push(ValidationError::InvalidRouteName {
                name: name.clone(),
                reason: "must not contain '{' or '}'",
            });
        } else if name.split('/').any(|s| s.starts_with([':', '*'])) {
            errors.push(ValidationError::InvalidRouteName {
                name: name.clone(),
                reason: "must not have segments starting with ':' or '*'",
            });
        }
        if command.trim().is_empty() {
            errors.push(ValidationError::EmptyCommand(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort_by_key(|e| e.to_string());
        Err(errors)
    }
}
