//! Circuit breaker for instance protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: instance assumed down, calls fail fast
//! - Half-Open: one probe call tests whether the instance recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures > threshold
//! Open → Half-Open: first call after the open duration (becomes the probe)
//! Half-Open → Closed: probe succeeds (counter reset)
//! Half-Open → Open: probe fails (timer reset)
//! ```
//!
//! # Design Decisions
//! - Per-instance circuit breaker (not global)
//! - Fail fast in Open state, without touching the rate limiter or the instance
//! - Single probe in Half-Open; concurrent callers are rejected
//! - Admission hands out a [`Permit`]; a permit dropped without an outcome
//!   frees the probe slot and changes nothing else
//! - Each transition starts a new generation; outcomes reported through a
//!   permit from an older generation are ignored

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use futures_util::future::{BoxFuture, FutureExt};

use crate::config::CircuitBreakerConfig;
use crate::endpoint::{Endpoint, Failure, SharedEndpoint};
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker, for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub generation: u64,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    /// When the current state was entered.
    changed_at: Instant,
    generation: u64,
    probe_in_flight: bool,
}

/// Per-instance circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: Arc<str>,
    failure_threshold: u32,
    open_duration: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: Arc<str>, failure_threshold: u32, open_duration: Duration) -> Self {
        Self {
            name,
            failure_threshold,
            open_duration,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                changed_at: Instant::now(),
                generation: 0,
                probe_in_flight: false,
            }),
        }
    }

    pub fn from_config(name: Arc<str>, config: &CircuitBreakerConfig) -> Self {
        Self::new(name, config.failure_threshold, config.open_duration())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask to make a call. Rejections are [`Failure::CircuitOpen`].
    pub fn try_acquire(&self) -> Result<Permit<'_>, Failure> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(Permit::new(self, inner.generation, false)),
            CircuitState::Open => {
                if inner.changed_at.elapsed() < self.open_duration {
                    return Err(Failure::CircuitOpen);
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.probe_in_flight = true;
                Ok(Permit::new(self, inner.generation, true))
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    return Err(Failure::CircuitOpen);
                }
                inner.probe_in_flight = true;
                Ok(Permit::new(self, inner.generation, true))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            generation: inner.generation,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn on_success(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Closed),
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures > self.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    fn release_probe(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.changed_at = Instant::now();
        inner.generation += 1;
        inner.probe_in_flight = false;
        if to == CircuitState::Closed {
            inner.consecutive_failures = 0;
        }

        match to {
            CircuitState::Open => tracing::warn!(
                instance = %self.name,
                from = from.as_str(),
                consecutive_failures = inner.consecutive_failures,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                instance = %self.name,
                "Circuit breaker half-open, admitting probe"
            ),
            CircuitState::Closed => tracing::info!(
                instance = %self.name,
                "Circuit breaker closed"
            ),
        }
        metrics::record_breaker_transition(&self.name, to.as_str());
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`].
///
/// Consume it with [`Permit::record_success`] or [`Permit::record_failure`].
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64, probe: bool) -> Self {
        Self {
            breaker,
            generation,
            probe,
            settled: false,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.generation);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.generation);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.settled {
            self.breaker.release_probe(self.generation);
        }
    }
}

/// Guards an endpoint with a [`CircuitBreaker`].
pub struct CircuitBreakerEndpoint<Req, Resp> {
    breaker: CircuitBreaker,
    inner: SharedEndpoint<Req, Resp>,
}

impl<Req, Resp> CircuitBreakerEndpoint<Req, Resp> {
    pub fn new(breaker: CircuitBreaker, inner: SharedEndpoint<Req, Resp>) -> Self {
        Self { breaker, inner }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<Req, Resp> Endpoint<Req, Resp> for CircuitBreakerEndpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, Failure>> {
        self.call_within(request, None)
    }

    fn call_within<'a>(
        &'a self,
        request: Req,
        limit: Option<Duration>,
    ) -> BoxFuture<'a, Result<Resp, Failure>>
    where
        Resp: 'a,
    {
        async move {
            let permit = self.breaker.try_acquire()?;
            // The deadline sits under the permit so an overrun is settled as a failure.
            let result = self.inner.call_within(request, limit).await;
            match &result {
                Ok(_) => permit.record_success(),
                Err(failure) if failure.counts_against_breaker() => permit.record_failure(),
                // Cancellation says nothing about the instance.
                Err(_) => drop(permit),
            }
            result
        }
        .boxed()
    }
}
