//! In-process implementation of the string operations.

use futures_util::future::{self, BoxFuture, FutureExt};

use super::{validate_input, ServiceError, StringService};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStringService;

impl LocalStringService {
    pub fn new() -> Self {
        Self
    }
}

/// Byte-wise palindrome check.
fn is_palindrome(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().eq(bytes.iter().rev())
}

impl StringService for LocalStringService {
    fn uppercase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        future::ready(validate_input(&s).map(|_| s.to_uppercase())).boxed()
    }

    fn downcase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        future::ready(validate_input(&s).map(|_| s.to_lowercase())).boxed()
    }

    fn count(&self, s: String) -> BoxFuture<'_, usize> {
        future::ready(s.len()).boxed()
    }

    fn palindrome(&self, s: String) -> BoxFuture<'_, Result<bool, ServiceError>> {
        future::ready(validate_input(&s).map(|_| is_palindrome(&s))).boxed()
    }
}
