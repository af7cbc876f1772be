//! Proxying middleware.
//!
//! Forwards `uppercase` and `downcase` to remote instances through one
//! [`Dispatcher`] each, and serves `count` and `palindrome` through the next
//! service. With no instances configured the middleware is the identity.

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::dispatcher::{build_executor, Dispatcher, ResilienceSettings};
use crate::config::{ConfigError, ServiceConfig};
use crate::endpoint::http::{build_client, HttpClient};
use crate::endpoint::wire::StringReply;
use crate::endpoint::{
    endpoint_fn, HttpEndpoint, Operation, Reply, SharedEndpoint, StringRequest, WireResponse,
};
use crate::service::{validate_input, ServiceError, ServiceMiddleware, StringService};

type StringDispatcher = Dispatcher<StringRequest, StringReply>;

/// Build the proxying middleware for `config.proxy.instances`.
///
/// Every adapter, breaker and bucket is created here, so a malformed instance
/// address fails before the service starts. `cancel` aborts in-flight proxied
/// calls, typically on shutdown.
pub fn proxying(
    config: &ServiceConfig,
    cancel: CancellationToken,
) -> Result<ServiceMiddleware, ConfigError> {
    let instances = &config.proxy.instances;
    if instances.is_empty() {
        tracing::info!(proxy_to = "none", "Serving all operations locally");
        return Ok(Box::new(|next: Arc<dyn StringService>| next));
    }

    let settings = ResilienceSettings::from(config);
    let client = build_client();
    let uppercase = build_executor(Operation::Uppercase, instances, &settings, |instance| {
        http_endpoint(instance, Operation::Uppercase, &client)
    })?;
    let downcase = build_executor(Operation::Downcase, instances, &settings, |instance| {
        http_endpoint(instance, Operation::Downcase, &client)
    })?;

    tracing::info!(
        proxy_to = ?instances,
        max_attempts = settings.retry.max_attempts,
        max_time_ms = settings.retry.max_time.as_millis() as u64,
        "Proxying uppercase and downcase"
    );

    Ok(Box::new(move |next: Arc<dyn StringService>| {
        let uppercase = Dispatcher::with_fallback(
            Operation::Uppercase,
            uppercase,
            local_endpoint(next.clone(), Operation::Uppercase),
        );
        let downcase = Dispatcher::with_fallback(
            Operation::Downcase,
            downcase,
            local_endpoint(next.clone(), Operation::Downcase),
        );
        Arc::new(ProxyingService::new(next, uppercase, downcase, cancel)) as Arc<dyn StringService>
    }))
}

fn http_endpoint(
    instance: &str,
    operation: Operation,
    client: &HttpClient,
) -> Result<SharedEndpoint<StringRequest, StringReply>, ConfigError> {
    let endpoint: HttpEndpoint<StringRequest, StringReply> =
        HttpEndpoint::new(instance, operation, client.clone())?;
    Ok(Arc::new(endpoint))
}

/// Expose one case operation of `next` as an endpoint, errors in the body.
fn local_endpoint(
    next: Arc<dyn StringService>,
    operation: Operation,
) -> SharedEndpoint<StringRequest, StringReply> {
    Arc::new(endpoint_fn(move |request: StringRequest| {
        let next = next.clone();
        async move {
            let result = match operation {
                Operation::Downcase => next.downcase(request.s).await,
                _ => next.uppercase(request.s).await,
            };
            Ok(Reply::from_result(result))
        }
    }))
}

pub struct ProxyingService {
    next: Arc<dyn StringService>,
    uppercase: StringDispatcher,
    downcase: StringDispatcher,
    cancel: CancellationToken,
}

impl ProxyingService {
    pub fn new(
        next: Arc<dyn StringService>,
        uppercase: StringDispatcher,
        downcase: StringDispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            next,
            uppercase,
            downcase,
            cancel,
        }
    }

    async fn dispatch(&self, dispatcher: &StringDispatcher, s: String) -> Result<String, ServiceError> {
        validate_input(&s)?;
        let reply = dispatcher.call(StringRequest::new(s), &self.cancel).await?;
        match reply.error() {
            Some(err) => Err(ServiceError::from_wire(err)),
            None => Ok(reply.v),
        }
    }
}

impl StringService for ProxyingService {
    fn uppercase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        self.dispatch(&self.uppercase, s).boxed()
    }

    fn downcase(&self, s: String) -> BoxFuture<'_, Result<String, ServiceError>> {
        self.dispatch(&self.downcase, s).boxed()
    }

    fn count(&self, s: String) -> BoxFuture<'_, usize> {
        self.next.count(s)
    }

    fn palindrome(&self, s: String) -> BoxFuture<'_, Result<bool, ServiceError>> {
        self.next.palindrome(s)
    }
}
