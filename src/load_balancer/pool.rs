//! Instance pool management.
//!
//! # Responsibilities
//! - Hold the fixed, ordered set of wrapped endpoints for one operation
//! - Apply the load balancing algorithm to select the next member

use std::sync::Arc;

use crate::endpoint::SharedEndpoint;
use crate::load_balancer::{LoadBalancer, RoundRobin};

/// One selectable instance.
pub struct Member<Req, Resp> {
    /// Instance address, as configured.
    pub instance: Arc<str>,
    /// The instance's endpoint, already wrapped by its breaker and limiter.
    pub endpoint: SharedEndpoint<Req, Resp>,
}

impl<Req, Resp> Member<Req, Resp> {
    pub fn new(instance: Arc<str>, endpoint: SharedEndpoint<Req, Resp>) -> Self {
        Self { instance, endpoint }
    }
}

impl<Req, Resp> Clone for Member<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Ordered members plus the algorithm that picks among them.
pub struct Pool<Req, Resp> {
    members: Vec<Member<Req, Resp>>,
    balancer: Box<dyn LoadBalancer>,
}

impl<Req, Resp> Pool<Req, Resp> {
    pub fn new(members: Vec<Member<Req, Resp>>, balancer: Box<dyn LoadBalancer>) -> Self {
        Self { members, balancer }
    }

    pub fn round_robin(members: Vec<Member<Req, Resp>>) -> Self {
        Self::new(members, Box::new(RoundRobin::new()))
    }

    /// Select the next member. `None` only for an empty pool.
    pub fn next(&self) -> Option<&Member<Req, Resp>> {
        let idx = self.balancer.next_index(self.members.len())?;
        self.members.get(idx)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Instance addresses in selection order.
    pub fn instances(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.instance.as_ref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{endpoint_fn, Failure};

    fn member(name: &'static str) -> Member<(), &'static str> {
        Member::new(
            Arc::from(name),
            Arc::new(endpoint_fn(move |_: ()| async move { Ok::<_, Failure>(name) })),
        )
    }

    #[tokio::test]
    async fn test_pool_rotates_in_order() {
        let pool = Pool::round_robin(vec![member("a"), member("b"), member("c")]);
        assert_eq!(pool.instances(), vec!["a", "b", "c"]);

        let mut served = Vec::new();
        for _ in 0..4 {
            let m = pool.next().unwrap();
            served.push(m.endpoint.call(()).await.unwrap());
        }
        assert_eq!(served, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_empty_pool_selects_nothing() {
        let pool: Pool<(), &'static str> = Pool::round_robin(Vec::new());
        assert!(pool.is_empty());
        assert!(pool.next().is_none());
    }
}
