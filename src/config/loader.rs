//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{split_instances, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `proxy.instances`.
pub const PROXY_ENV: &str = "STRINGSVC_PROXY";

/// Error type for configuration loading and startup wiring.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid instance '{instance}': {reason}")]
    InvalidInstance { instance: String, reason: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides. Only the instance list is overridable.
pub fn apply_env_overrides(config: &mut ServiceConfig) {
    if let Ok(list) = std::env::var(PROXY_ENV) {
        config.proxy.instances = split_instances(&list);
    }
}
