//! Per-operation dispatcher.
//!
//! # Responsibilities
//! - Assemble the per-instance pipeline once, at startup
//! - Route each call either through the pipeline or straight to the local
//!   fallback when no instances are configured
//!
//! # Data Flow
//! ```text
//! instances ["a", "b", ...]
//!     → make_endpoint(instance)          (adapter, fails fast on bad address)
//!     → RateLimitedEndpoint              (own TokenBucket per instance)
//!     → CircuitBreakerEndpoint           (own CircuitBreaker per instance)
//!     → Member → Pool (round robin)
//!     → RetryExecutor (attempts + time budget)
//! ```

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{CircuitBreakerConfig, ConfigError, RateLimitConfig, ServiceConfig};
use crate::endpoint::{Failure, Operation, SharedEndpoint};
use crate::load_balancer::{Member, Pool};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerEndpoint, RateLimitedEndpoint, RetryExecutor, RetryPolicy,
    TokenBucket,
};

/// Knobs for every pipeline built by one process.
#[derive(Debug, Clone, Default)]
pub struct ResilienceSettings {
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryPolicy,
}

impl From<&ServiceConfig> for ResilienceSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            rate_limit: config.rate_limit.clone(),
            circuit_breaker: config.circuit_breaker.clone(),
            retry: RetryPolicy::from(&config.retries),
        }
    }
}

/// Build the retrying, balanced executor for `operation`.
///
/// `make_endpoint` turns one instance address into its bare adapter. Returns
/// `Ok(None)` for an empty instance list.
pub fn build_executor<Req, Resp, F>(
    operation: Operation,
    instances: &[String],
    settings: &ResilienceSettings,
    mut make_endpoint: F,
) -> Result<Option<RetryExecutor<Req, Resp>>, ConfigError>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
    F: FnMut(&str) -> Result<SharedEndpoint<Req, Resp>, ConfigError>,
{
    let mut members = Vec::with_capacity(instances.len());
    for instance in instances {
        let name: Arc<str> = Arc::from(instance.trim());
        let adapter = make_endpoint(instance)?;

        let limited: SharedEndpoint<Req, Resp> = Arc::new(RateLimitedEndpoint::new(
            name.clone(),
            TokenBucket::from_config(&settings.rate_limit),
            adapter,
        ));
        let guarded: SharedEndpoint<Req, Resp> = Arc::new(CircuitBreakerEndpoint::new(
            CircuitBreaker::from_config(name.clone(), &settings.circuit_breaker),
            limited,
        ));
        members.push(Member::new(name, guarded));
    }

    if members.is_empty() {
        return Ok(None);
    }
    Ok(Some(RetryExecutor::new(
        operation.name(),
        Pool::round_robin(members),
        settings.retry,
    )))
}

enum Route<Req, Resp> {
    /// No instances: call the local implementation, bypassing every
    /// resilience layer.
    Passthrough(SharedEndpoint<Req, Resp>),
    Balanced(RetryExecutor<Req, Resp>),
}

/// Entry point for one logical operation.
pub struct Dispatcher<Req, Resp> {
    operation: Operation,
    route: Route<Req, Resp>,
}

impl<Req, Resp> Dispatcher<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    pub fn passthrough(operation: Operation, fallback: SharedEndpoint<Req, Resp>) -> Self {
        Self {
            operation,
            route: Route::Passthrough(fallback),
        }
    }

    pub fn balanced(operation: Operation, executor: RetryExecutor<Req, Resp>) -> Self {
        Self {
            operation,
            route: Route::Balanced(executor),
        }
    }

    /// Dispatch to `executor` if there is one, else to `fallback`.
    pub fn with_fallback(
        operation: Operation,
        executor: Option<RetryExecutor<Req, Resp>>,
        fallback: SharedEndpoint<Req, Resp>,
    ) -> Self {
        match executor {
            Some(executor) => Self::balanced(operation, executor),
            None => Self::passthrough(operation, fallback),
        }
    }

    /// Build the full pipeline for `instances`.
    pub fn build<F>(
        operation: Operation,
        instances: &[String],
        settings: &ResilienceSettings,
        fallback: SharedEndpoint<Req, Resp>,
        make_endpoint: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Result<SharedEndpoint<Req, Resp>, ConfigError>,
    {
        let executor = build_executor(operation, instances, settings, make_endpoint)?;
        Ok(Self::with_fallback(operation, executor, fallback))
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.route, Route::Passthrough(_))
    }

    /// Instances in rotation order; empty in passthrough mode.
    pub fn instances(&self) -> Vec<&str> {
        match &self.route {
            Route::Passthrough(_) => Vec::new(),
            Route::Balanced(executor) => executor.pool().instances(),
        }
    }

    pub async fn call(&self, request: Req, cancel: &CancellationToken) -> Result<Resp, Failure> {
        match &self.route {
            Route::Passthrough(fallback) => fallback.call(request).await,
            Route::Balanced(executor) => executor.execute(request, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::endpoint_fn;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Fake adapters: instances named in `failing` always fail, the rest echo.
    fn fake_factory(
        log: &Log,
        failing: &'static [&'static str],
    ) -> impl FnMut(&str) -> Result<SharedEndpoint<String, String>, ConfigError> {
        let log = log.clone();
        move |instance: &str| {
            let name = instance.to_string();
            let log = log.clone();
            let ep: SharedEndpoint<String, String> = Arc::new(endpoint_fn(move |s: String| {
                log.lock().unwrap().push(name.clone());
                let fail = failing.contains(&name.as_str());
                let name = name.clone();
                async move {
                    if fail {
                        Err(Failure::Remote(format!("{} down", name)))
                    } else {
                        Ok(format!("{}:{}", name, s.to_uppercase()))
                    }
                }
            }));
            Ok(ep)
        }
    }

    fn unused_fallback() -> SharedEndpoint<String, String> {
        Arc::new(endpoint_fn(|_s: String| async {
            Err::<String, _>(Failure::Transport("fallback must not be called".into()))
        }))
    }

    fn instances(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_instance_list_uses_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let fallback: SharedEndpoint<String, String> = Arc::new(endpoint_fn(move |s: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(s.to_uppercase()) }
        }));

        let log = Log::default();
        let d = Dispatcher::build(
            Operation::Uppercase,
            &[],
            &ResilienceSettings::default(),
            fallback,
            fake_factory(&log, &[]),
        )
        .unwrap();

        assert!(d.is_passthrough());
        assert_eq!(d.call("hello".into(), &CancellationToken::new()).await, Ok("HELLO".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_pool_served_by_first_instance() {
        let log = Log::default();
        let d = Dispatcher::build(
            Operation::Uppercase,
            &instances(&["a", "b", "c"]),
            &ResilienceSettings::default(),
            unused_fallback(),
            fake_factory(&log, &[]),
        )
        .unwrap();

        assert_eq!(d.instances(), vec!["a", "b", "c"]);
        assert_eq!(d.call("hello".into(), &CancellationToken::new()).await, Ok("a:HELLO".into()));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_pool_tries_in_rotation_and_reports_last() {
        let log = Log::default();
        let d = Dispatcher::build(
            Operation::Uppercase,
            &instances(&["a", "b"]),
            &ResilienceSettings::default(),
            unused_fallback(),
            fake_factory(&log, &["a", "b"]),
        )
        .unwrap();

        let err = d.call("hello".into(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "a"]);
        assert_eq!(err.root(), &Failure::Remote("a down".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_moves_traffic_to_other_instance() {
        let log = Log::default();
        let mut settings = ResilienceSettings::default();
        settings.circuit_breaker.failure_threshold = 1;
        settings.retry.max_attempts = 2;
        let d = Dispatcher::build(
            Operation::Uppercase,
            &instances(&["a", "b"]),
            &settings,
            unused_fallback(),
            fake_factory(&log, &["a"]),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        for _ in 0..4 {
            assert!(d.call("x".into(), &cancel).await.is_ok());
        }

        // Each call tries a, then b. After two failures a's breaker opens and
        // later calls never reach a's adapter.
        let mut hits: HashMap<String, usize> = HashMap::new();
        for name in log.lock().unwrap().iter() {
            *hits.entry(name.clone()).or_default() += 1;
        }
        assert_eq!(hits.get("a"), Some(&2));
        assert_eq!(hits.get("b"), Some(&4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_instance_is_skipped() {
        let log = Log::default();
        let mut settings = ResilienceSettings::default();
        settings.rate_limit.burst = 1;
        settings.rate_limit.refill_per_second = 0.0;
        let d = Dispatcher::build(
            Operation::Uppercase,
            &instances(&["a", "b"]),
            &settings,
            unused_fallback(),
            fake_factory(&log, &[]),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        assert_eq!(d.call("x".into(), &cancel).await, Ok("a:X".into()));
        assert_eq!(d.call("x".into(), &cancel).await, Ok("b:X".into()));
        // a and b are both out of tokens: a, b, a all deny.
        let err = d.call("x".into(), &cancel).await.unwrap_err();
        assert_eq!(err.root(), &Failure::RateLimited);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(d.call("x".into(), &cancel).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_instance_that_keeps_timing_out_trips_its_breaker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut settings = ResilienceSettings::default();
        settings.circuit_breaker.failure_threshold = 0;
        settings.retry.max_attempts = 1;
        settings.retry.bound_attempts_by_deadline = true;
        let d = Dispatcher::build(
            Operation::Uppercase,
            &instances(&["slow"]),
            &settings,
            unused_fallback(),
            move |_instance: &str| {
                let counter = counter.clone();
                let ep: SharedEndpoint<String, String> = Arc::new(endpoint_fn(move |s: String| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok(s)
                    }
                }));
                Ok(ep)
            },
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let first = d.call("x".into(), &cancel).await.unwrap_err();
        assert_eq!(first.root(), &Failure::Timeout);
        for _ in 0..2 {
            let err = d.call("x".into(), &cancel).await.unwrap_err();
            assert_eq!(err.root(), &Failure::CircuitOpen);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_errors_abort_the_build() {
        let result: Result<Dispatcher<String, String>, _> = Dispatcher::build(
            Operation::Uppercase,
            &instances(&["good", "bad"]),
            &ResilienceSettings::default(),
            unused_fallback(),
            |instance: &str| {
                if instance == "bad" {
                    Err(ConfigError::InvalidInstance {
                        instance: instance.to_string(),
                        reason: "nope".into(),
                    })
                } else {
                    Ok(unused_fallback())
                }
            },
        );
        assert!(matches!(result, Err(ConfigError::InvalidInstance { .. })));
    }
}
