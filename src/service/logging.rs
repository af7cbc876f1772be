//! Logging middleware.
//!
//! Emits one `info` event per call with the method, input, result and the
//! time the call took.

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Instant;

use super::{ServiceError, ServiceMiddleware, StringService};

pub struct LoggingService {
    next: Arc<dyn StringService>,
}

impl LoggingService {
    pub fn new(next: Arc<dyn StringService>) -> Self {
        Self { next }
    }

    pub fn middleware() -> ServiceMiddleware {
        Box::new(|next| Arc::new(LoggingService::new(next)) as Arc<dyn StringService>)
    }
}

fn err_field<T>(result: &Result<T, ServiceError>) -> Option<String> {
    result.as_ref().err().map(ToString::to_string)
}

impl StringService for LoggingService {
    fn uppercase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        async move {
            let begin = Instant::now();
            let result = self.next.uppercase(s.clone()).await;
            tracing::info!(
                method = "uppercase",
                input = %s,
                output = result.as_deref().unwrap_or_default(),
                err = ?err_field(&result),
                took = ?begin.elapsed(),
            );
            result
        }
        .boxed()
    }

    fn downcase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        async move {
            let begin = Instant::now();
            let result = self.next.downcase(s.clone()).await;
            tracing::info!(
                method = "downcase",
                input = %s,
                output = result.as_deref().unwrap_or_default(),
                err = ?err_field(&result),
                took = ?begin.elapsed(),
            );
            result
        }
        .boxed()
    }

    fn count(&self, s: String) -> BoxFuture<'_, usize> {
        async move {
            let begin = Instant::now();
            let n = self.next.count(s.clone()).await;
            tracing::info!(method = "count", input = %s, n, took = ?begin.elapsed());
            n
        }
        .boxed()
    }

    fn palindrome(&self, s: String) -> BoxFuture<'_, Result<bool, ServiceError>> {
        async move {
            let begin = Instant::now();
            let result = self.next.palindrome(s.clone()).await;
            tracing::info!(
                method = "palindrome",
                input = %s,
                p = *result.as_ref().unwrap_or(&false),
                err = ?err_field(&result),
                took = ?begin.elapsed(),
            );
            result
        }
        .boxed()
    }
}
