//! Retry logic.
//!
//! # Responsibilities
//! - Select a member and call it, up to `max_attempts` times per call
//! - Stop once the wall-clock budget is spent, checked between attempts
//! - Stop immediately when the caller cancels
//! - Report the most recent failure when giving up
//!
//! # Design Decisions
//! - Every failure kind is retried, circuit-open rejections included; the next
//!   attempt lands on the next instance in rotation
//! - No backoff between attempts; rotation already spreads the load
//! - Attempt count and start time are per top-level call, never shared

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::endpoint::Failure;
use crate::load_balancer::Pool;
use crate::observability::metrics;
use crate::resilience::timeouts;

/// Immutable retry settings shared by every call of one dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_time: Duration,
    /// Bound each attempt by what is left of `max_time`.
    pub bound_attempts_by_deadline: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            max_time: config.max_time(),
            bound_attempts_by_deadline: config.bound_attempts_by_deadline,
        }
    }
}

/// Runs calls against a [`Pool`] under a [`RetryPolicy`].
pub struct RetryExecutor<Req, Resp> {
    operation: &'static str,
    pool: Pool<Req, Resp>,
    policy: RetryPolicy,
}

impl<Req, Resp> RetryExecutor<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(operation: &'static str, pool: Pool<Req, Resp>, policy: RetryPolicy) -> Self {
        Self {
            operation,
            pool,
            policy,
        }
    }

    pub fn pool(&self) -> &Pool<Req, Resp> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute one top-level call.
    pub async fn execute(&self, request: Req, cancel: &CancellationToken) -> Result<Resp, Failure> {
        let started = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0;
        let mut last = Failure::NoEndpoints;

        while attempts < max_attempts {
            if cancel.is_cancelled() {
                return Err(Failure::Cancelled);
            }

            let limit = self
                .policy
                .bound_attempts_by_deadline
                .then(|| timeouts::remaining(started, self.policy.max_time));
            if attempts > 0 && limit == Some(Duration::ZERO) {
                break;
            }

            let Some(member) = self.pool.next() else {
                return Err(Failure::NoEndpoints);
            };
            attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Failure::Cancelled),
                result = member.endpoint.call_within(request.clone(), limit) => result,
            };

            match outcome {
                Ok(response) => {
                    metrics::record_attempt(self.operation, "success");
                    return Ok(response);
                }
                Err(failure) if failure.is_cancellation() => {
                    metrics::record_attempt(self.operation, "cancelled");
                    return Err(failure);
                }
                Err(failure) => {
                    metrics::record_attempt(self.operation, failure.kind());
                    tracing::debug!(
                        operation = self.operation,
                        instance = %member.instance,
                        attempt = attempts,
                        error = %failure,
                        "Attempt failed"
                    );
                    last = failure;
                }
            }

            if started.elapsed() > self.policy.max_time {
                break;
            }
        }

        tracing::warn!(
            operation = self.operation,
            attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = %last,
            "Giving up after retries"
        );
        Err(Failure::RetryExhausted {
            attempts,
            last: Box::new(last),
        })
    }
}
