//! Round-robin dispatch over a static endpoint list.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{BackendEndpoint, DispatchStrategy};
use crate::error::{ProxyError, Result};

/// Cycles through a fixed, ordered list of endpoints.
///
/// Ignores the creation body. Thread-safe via an atomic cursor that always
/// stays in `0..endpoints.len()`, so the sequence is periodic forever.
#[derive(Debug)]
pub struct RoundRobinStrategy {
    endpoints: Vec<BackendEndpoint>,
    cursor: AtomicUsize,
}

impl RoundRobinStrategy {
    /// Creates a strategy over `endpoints`. The list must not be empty.
    pub fn new(endpoints: Vec<BackendEndpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ProxyError::Config(
                "round-robin strategy needs at least one backend".to_string(),
            ));
        }

        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the next endpoint and advances the cursor.
    pub fn next_endpoint(&self) -> &BackendEndpoint {
        let len = self.endpoints.len();
        let idx = match self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some((c + 1) % len))
        {
            Ok(prev) | Err(prev) => prev,
        };
        &self.endpoints[idx]
    }
}

#[async_trait]
impl DispatchStrategy for RoundRobinStrategy {
    async fn select_backend(&self, _creation_body: &[u8]) -> Result<BackendEndpoint> {
        Ok(self.next_endpoint().clone())
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    fn make_pool(ports: &[u16]) -> Vec<BackendEndpoint> {
        ports
            .iter()
            .map(|p| BackendEndpoint::new("localhost", *p))
            .collect()
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = RoundRobinStrategy::new(vec![]);
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_single_endpoint_always_selected() {
        let rr = RoundRobinStrategy::new(make_pool(&[4723])).unwrap();
        for _ in 0..5 {
            assert_eq!(rr.next_endpoint().port(), 4723);
        }
    }

    #[test]
    fn test_three_endpoints_cycle_in_order() {
        let rr = RoundRobinStrategy::new(make_pool(&[4723, 4823, 4923])).unwrap();
        let ports: Vec<u16> = (0..7).map(|_| rr.next_endpoint().port()).collect();
        assert_eq!(ports, vec![4723, 4823, 4923, 4723, 4823, 4923, 4723]);
    }

    #[test]
    fn test_even_distribution() {
        let rr = RoundRobinStrategy::new(make_pool(&[1, 2, 3])).unwrap();
        let mut counts = HashMap::new();
        for _ in 0..100 {
            *counts.entry(rr.next_endpoint().port()).or_insert(0) += 1;
        }

        // 100 calls over 3 endpoints: each at least floor(100 / 3)
        assert_eq!(counts.get(&1), Some(&34));
        assert_eq!(counts.get(&2), Some(&33));
        assert_eq!(counts.get(&3), Some(&33));
    }

    #[tokio::test]
    async fn test_select_backend_ignores_body() {
        let rr = RoundRobinStrategy::new(make_pool(&[4723, 4823])).unwrap();

        let bodies: [&[u8]; 4] = [
            b"",
            b"not json",
            br#"{"desiredCapabilities":{"platformName":"Android"}}"#,
            br#"{"desiredCapabilities":{}}"#,
        ];
        let mut ports = vec![];
        for body in bodies {
            ports.push(rr.select_backend(body).await.unwrap().port());
        }

        assert_eq!(ports, vec![4723, 4823, 4723, 4823]);
    }

    #[test]
    fn test_concurrent_selection_keeps_period() {
        use std::thread;

        let rr = Arc::new(RoundRobinStrategy::new(make_pool(&[1, 2, 3, 4])).unwrap());
        let mut handles = vec![];

        for _ in 0..8 {
            let rr = Arc::clone(&rr);
            handles.push(thread::spawn(move || {
                let mut counts = HashMap::new();
                for _ in 0..100 {
                    *counts.entry(rr.next_endpoint().port()).or_insert(0usize) += 1;
                }
                counts
            }));
        }

        let mut totals: HashMap<u16, usize> = HashMap::new();
        for handle in handles {
            for (port, n) in handle.join().unwrap() {
                *totals.entry(port).or_insert(0) += n;
            }
        }

        // 800 selections over 4 endpoints: exactly 200 each
        for port in 1..=4 {
            assert_eq!(totals.get(&port), Some(&200));
        }
    }

    #[test]
    fn test_strategy_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoundRobinStrategy>();
    }
}
