//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Stores an internal cursor to rotate through members in order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        // The cursor stays below `len`, so it never overflows and a pool of
        // one always yields index 0.
        let current = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        Some(current % len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let picks: Vec<usize> = (0..7).filter_map(|_| lb.next_index(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_pool() {
        let lb = RoundRobin::new();
        assert_eq!(lb.next_index(0), None);
        assert_eq!(lb.next_index(2), Some(0));
    }

    #[test]
    fn test_concurrent_selection_is_fair() {
        let lb = Arc::new(RoundRobin::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lb = lb.clone();
                std::thread::spawn(move || {
                    (0..300).filter_map(|_| lb.next_index(3)).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for idx in handle.join().unwrap() {
                *counts.entry(idx).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&n| n == 400));
    }
}
