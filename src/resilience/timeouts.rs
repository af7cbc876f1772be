//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound an attempt by the remainder of the retry budget, when asked to
//! - Report overruns as [`Failure::Timeout`], distinct from transport errors

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::endpoint::Failure;

/// Await `call`, giving up after `limit` if one is set.
pub async fn bounded<T, F>(call: F, limit: Option<Duration>) -> Result<T, Failure>
where
    F: Future<Output = Result<T, Failure>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(Failure::Timeout)),
        None => call.await,
    }
}

/// What is left of `budget` since `started`, saturating at zero.
pub fn remaining(started: Instant, budget: Duration) -> Duration {
    budget.saturating_sub(started.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Failure>(1)
        };
        assert_eq!(bounded(slow, Some(Duration::from_secs(1))).await, Err(Failure::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_waits() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Failure>(1)
        };
        assert_eq!(bounded(slow, None).await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_saturates() {
        let started = Instant::now();
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(remaining(started, Duration::from_millis(250)), Duration::from_millis(150));
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(remaining(started, Duration::from_millis(250)), Duration::ZERO);
    }
}
