//! Per-instance token bucket.
//!
//! # Responsibilities
//! - Admit or deny one attempt without waiting
//! - Refill lazily from the time elapsed since the last admission check
//!
//! # Design Decisions
//! - The bucket starts full, so a fresh instance can absorb a whole burst
//! - The lock is only held for arithmetic and never across an await

use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use futures_util::future::{BoxFuture, FutureExt};

use crate::config::RateLimitConfig;
use crate::endpoint::{Endpoint, Failure, SharedEndpoint};

/// A token bucket with capacity `capacity` refilled at `refill_rate` tokens/s.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_rate: refill_rate.max(0.0),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_update: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.burst, config.refill_per_second)
    }

    /// Take one token if one is available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after refill.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_update = now;
    }
}

/// Gates an endpoint behind a [`TokenBucket`].
pub struct RateLimitedEndpoint<Req, Resp> {
    instance: Arc<str>,
    bucket: TokenBucket,
    inner: SharedEndpoint<Req, Resp>,
}

impl<Req, Resp> RateLimitedEndpoint<Req, Resp> {
    pub fn new(instance: Arc<str>, bucket: TokenBucket, inner: SharedEndpoint<Req, Resp>) -> Self {
        Self {
            instance,
            bucket,
            inner,
        }
    }

    pub fn bucket(&self) -> &TokenBucket {
        &self.bucket
    }
}

impl<Req, Resp> Endpoint<Req, Resp> for RateLimitedEndpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn call(&self, request: Req) -> BoxFuture<'_, Result<Resp, Failure>> {
        if !self.bucket.try_acquire() {
            tracing::debug!(instance = %self.instance, "Rate limit exceeded");
            return futures_util::future::ready(Err(Failure::RateLimited)).boxed();
        }
        self.inner.call(request)
    }
}
