//! Instrumenting middleware.
//!
//! Records call counts and latency per method, plus the distribution of
//! `count` results.

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Instant;

use super::{ServiceError, ServiceMiddleware, StringService};
use crate::observability::metrics;

pub struct InstrumentingService {
    next: Arc<dyn StringService>,
}

impl InstrumentingService {
    pub fn new(next: Arc<dyn StringService>) -> Self {
        Self { next }
    }

    pub fn middleware() -> ServiceMiddleware {
        Box::new(|next| Arc::new(InstrumentingService::new(next)) as Arc<dyn StringService>)
    }
}

impl StringService for InstrumentingService {
    fn uppercase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        async move {
            let begin = Instant::now();
            let result = self.next.uppercase(s).await;
            metrics::record_request("uppercase", result.is_err(), begin.elapsed());
            result
        }
        .boxed()
    }

    fn downcase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        async move {
            let begin = Instant::now();
            let result = self.next.downcase(s).await;
            metrics::record_request("downcase", result.is_err(), begin.elapsed());
            result
        }
        .boxed()
    }

    fn count(&self, s: String) -> BoxFuture<'_, usize> {
        async move {
            let begin = Instant::now();
            let n = self.next.count(s).await;
            metrics::record_request("count", false, begin.elapsed());
            metrics::record_count_result(n);
            n
        }
        .boxed()
    }

    fn palindrome(&self, s: String) -> BoxFuture<'_, Result<bool, ServiceError>> {
        async move {
            let begin = Instant::now();
            let result = self.next.palindrome(s).await;
            metrics::record_request("palindrome", result.is_err(), begin.elapsed());
            result
        }
        .boxed()
    }
}
