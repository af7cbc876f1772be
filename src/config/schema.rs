//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Root configuration for the string service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Remote instances to proxy to.
    pub proxy: ProxyConfig,

    /// Per-instance rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Per-instance circuit breaking.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry budget per dispatched call.
    pub retries: RetryConfig,

    /// Server-side timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Static set of remote instances.
///
/// `instances` accepts either a TOML array or a single comma-separated
/// string. An empty list means every operation is served locally.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    #[serde(deserialize_with = "deserialize_instances")]
    pub instances: Vec<String>,
}

/// Split a comma-separated instance list, trimming whitespace and dropping
/// empty entries.
pub fn split_instances(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_instances<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum InstanceList {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match InstanceList::deserialize(deserializer)? {
        InstanceList::Joined(s) => split_instances(&s),
        InstanceList::List(items) => split_instances(&items.join(",")),
    })
}

/// Token bucket settings applied to each instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Bucket capacity (burst size).
    pub burst: u32,

    /// Sustained refill rate in tokens per second.
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 100,
            refill_per_second: 1.0,
        }
    }
}

/// Circuit breaker settings applied to each instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// The breaker trips once consecutive failures exceed this value.
    pub failure_threshold: u32,

    /// How long the breaker stays open before admitting a probe.
    pub open_duration_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_duration_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 60_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per call, first attempt included.
    pub max_attempts: u32,

    /// Wall-clock budget across all attempts, in milliseconds.
    pub max_time_ms: u64,

    /// Bound each attempt by the remaining budget. Off by default: the budget
    /// is then only checked between attempts.
    pub bound_attempts_by_deadline: bool,
}

impl RetryConfig {
    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_time_ms: 250,
            bound_attempts_by_deadline: false,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Install the Prometheus recorder and expose `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}
