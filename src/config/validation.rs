//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, burst > 0, finite refill rate)
//! - Reject malformed instance addresses before anything is started

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::endpoint::http::instance_url;
use crate::endpoint::Operation;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem instead of stopping at the first.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    for instance in &config.proxy.instances {
        if let Err(e) = instance_url(instance, Operation::Uppercase) {
            errors.push(ValidationError::new("proxy.instances", e.to_string()));
        }
    }

    if config.rate_limit.burst == 0 {
        errors.push(ValidationError::new("rate_limit.burst", "must be at least 1"));
    }
    let refill = config.rate_limit.refill_per_second;
    if !refill.is_finite() || refill < 0.0 {
        errors.push(ValidationError::new(
            "rate_limit.refill_per_second",
            "must be a finite, non-negative number",
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_time_ms == 0 {
        errors.push(ValidationError::new("retries.max_time_ms", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
