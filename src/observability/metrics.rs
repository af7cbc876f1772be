//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service and resilience metrics
//! - Install the Prometheus recorder and hand back a handle for `/metrics`
//!
//! # Metrics
//! - `stringsvc_requests_total` (counter): calls by method, error
//! - `stringsvc_request_duration_seconds` (histogram): latency by method, error
//! - `stringsvc_count_result` (histogram): values returned by `count`
//! - `stringsvc_proxy_attempts_total` (counter): attempts by operation, outcome
//! - `stringsvc_breaker_transitions_total` (counter): transitions by instance, state
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library code and
//!   tests can call the helpers freely

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Histogram bucket boundaries for latency metrics (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Install the global Prometheus recorder and register metric descriptions.
///
/// Call once at startup. Fails if another recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    describe_counter!(
        "stringsvc_requests_total",
        Unit::Count,
        "Total string service calls"
    );
    describe_histogram!(
        "stringsvc_request_duration_seconds",
        Unit::Seconds,
        "String service call duration"
    );
    describe_histogram!(
        "stringsvc_count_result",
        Unit::Count,
        "Values returned by count"
    );
    describe_counter!(
        "stringsvc_proxy_attempts_total",
        Unit::Count,
        "Proxied attempts by outcome"
    );
    describe_counter!(
        "stringsvc_breaker_transitions_total",
        Unit::Count,
        "Circuit breaker state transitions"
    );

    Ok(handle)
}

/// Record one service call.
pub fn record_request(method: &'static str, failed: bool, took: Duration) {
    let error = if failed { "true" } else { "false" };
    counter!("stringsvc_requests_total", "method" => method, "error" => error).increment(1);
    histogram!("stringsvc_request_duration_seconds", "method" => method, "error" => error)
        .record(took.as_secs_f64());
}

pub fn record_count_result(n: usize) {
    histogram!("stringsvc_count_result").record(n as f64);
}

/// Record one proxied attempt. `outcome` is `success` or a failure kind.
pub fn record_attempt(operation: &'static str, outcome: &'static str) {
    counter!("stringsvc_proxy_attempts_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

pub fn record_breaker_transition(instance: &str, to: &'static str) {
    counter!(
        "stringsvc_breaker_transitions_total",
        "instance" => instance.to_string(),
        "to" => to
    )
    .increment(1);
}
