//! Sliding-window (log) admission.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::factory::StrategyKind;
use super::limiter::RateLimiter;

/// Rate limiter recording every admitted request per client.
///
/// Each client's log holds the instants of its admitted requests, oldest
/// first. A request is admitted when fewer than `max_requests` of them lie
/// within the trailing window, so the log never grows past `max_requests`.
pub struct SlidingWindowLimiter {
    clients: DashMap<String, VecDeque<Instant>>,
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    /// Create a new sliding-window limiter on the system clock.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    /// Create a new sliding-window limiter reading time from `clock`.
    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: DashMap::new(),
            max_requests,
            window,
            clock,
        }
    }

    /// Pop every instant older than the window.
    fn prune(&self, log: &mut VecDeque<Instant>, now: Instant) {
        while log
            .front()
            .map_or(false, |&t| now.saturating_duration_since(t) > self.window)
        {
            log.pop_front();
        }
    }

    fn record(&self, client_key: &str, log: &mut VecDeque<Instant>, now: Instant) -> bool {
        self.prune(log, now);

        if log.len() < self.max_requests as usize {
            log.push_back(now);
            trace!(
                client = client_key,
                in_window = log.len(),
                limit = self.max_requests,
                "Request admitted"
            );
            true
        } else {
            debug!(client = client_key, limit = self.max_requests, "Rate limit exceeded");
            false
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn admit(&self, client_key: &str) -> bool {
        let now = self.clock.now();

        if let Some(mut log) = self.clients.get_mut(client_key) {
            return self.record(client_key, &mut log, now);
        }

        let mut log = self
            .clients
            .entry(client_key.to_owned())
            .or_insert_with(|| {
                debug!(client = client_key, "Creating request log for client");
                VecDeque::with_capacity(self.max_requests.min(16) as usize)
            });
        self.record(client_key, &mut log, now)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Sliding
    }

    fn max_requests(&self) -> u32 {
        self.max_requests
    }

    fn window(&self) -> Duration {
        self.window
    }

    fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;
        self.clients.retain(|_, log| {
            self.prune(log, now);
            if log.is_empty() {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    fn clear(&self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    fn limiter_at(max_requests: u32, window_ms: u64) -> (SlidingWindowLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter =
            SlidingWindowLimiter::with_clock(max_requests, Duration::from_millis(window_ms), clock.clone());
        (limiter, clock)
    }

    fn admit_at(limiter: &SlidingWindowLimiter, clock: &ManualClock, key: &str, t_ms: u64) -> bool {
        clock.set_elapsed(Duration::from_millis(t_ms));
        limiter.admit(key)
    }

    #[test]
    fn test_rejects_while_window_full_then_slides() {
        let (limiter, clock) = limiter_at(2, 1000);

        assert!(admit_at(&limiter, &clock, "c2", 0));
        assert!(admit_at(&limiter, &clock, "c2", 100));
        assert!(!admit_at(&limiter, &clock, "c2", 500));
        // t=0 and t=100 have both left the window
        assert!(admit_at(&limiter, &clock, "c2", 1150));
        assert!(admit_at(&limiter, &clock, "c2", 1160));
        // Log is now [1150, 1160]
        assert!(!admit_at(&limiter, &clock, "c2", 1170));
    }

    #[test]
    fn test_entry_at_exact_window_age_is_kept() {
        let (limiter, clock) = limiter_at(1, 1000);

        assert!(admit_at(&limiter, &clock, "c1", 0));
        assert!(!admit_at(&limiter, &clock, "c1", 1000));
        assert!(admit_at(&limiter, &clock, "c1", 1001));
    }

    #[test]
    fn test_rejection_does_not_record() {
        let (limiter, clock) = limiter_at(1, 1000);

        assert!(admit_at(&limiter, &clock, "c1", 0));
        // Rejected calls at 900 must not extend the block past t=1000
        assert!(!admit_at(&limiter, &clock, "c1", 900));
        assert!(admit_at(&limiter, &clock, "c1", 1001));
    }

    #[test]
    fn test_trailing_window_never_exceeds_limit() {
        let (limiter, clock) = limiter_at(3, 100);

        let mut admitted = Vec::new();
        for t in (0..2000).step_by(7) {
            if admit_at(&limiter, &clock, "steady", t) {
                admitted.push(t);
            }
        }

        for &t in &admitted {
            let in_window = admitted
                .iter()
                .filter(|&&a| a <= t && t - a <= 100)
                .count();
            assert!(in_window <= 3, "{} admits in window ending at {}", in_window, t);
        }
    }

    #[test]
    fn test_recovers_after_full_window_passes() {
        let (limiter, clock) = limiter_at(4, 500);

        for t in 0..4 {
            assert!(admit_at(&limiter, &clock, "c1", t));
        }
        assert!(!admit_at(&limiter, &clock, "c1", 10));
        assert!(admit_at(&limiter, &clock, "c1", 504));
    }

    #[test]
    fn test_clients_are_independent() {
        let (limiter, clock) = limiter_at(1, 1000);

        assert!(admit_at(&limiter, &clock, "a", 0));
        assert!(!admit_at(&limiter, &clock, "a", 1));
        assert!(admit_at(&limiter, &clock, "b", 2));
        assert_eq!(limiter.client_count(), 2);
    }

    #[test]
    fn test_zero_window_limits_same_instant() {
        let (limiter, clock) = limiter_at(2, 0);

        assert!(admit_at(&limiter, &clock, "c1", 0));
        assert!(admit_at(&limiter, &clock, "c1", 0));
        assert!(!admit_at(&limiter, &clock, "c1", 0));
        assert!(admit_at(&limiter, &clock, "c1", 1));
    }

    #[test]
    fn test_evict_expired_drops_empty_logs() {
        let (limiter, clock) = limiter_at(2, 1000);

        admit_at(&limiter, &clock, "old", 0);
        admit_at(&limiter, &clock, "fresh", 600);

        clock.set_elapsed(Duration::from_millis(1200));
        assert_eq!(limiter.evict_expired(), 1);
        assert_eq!(limiter.client_count(), 1);

        // "fresh" still has its t=600 entry in the window
        assert!(admit_at(&limiter, &clock, "fresh", 1200));
        assert!(!admit_at(&limiter, &clock, "fresh", 1200));
    }

    #[test]
    fn test_concurrent_admits_respect_limit() {
        let (limiter, _clock) = limiter_at(64, 60_000);
        let limiter = &limiter;

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(move || (0..40).filter(|_| limiter.admit("shared")).count()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 64);
    }

    #[test]
    fn test_concurrent_distinct_clients() {
        let (limiter, _clock) = limiter_at(5, 60_000);
        let limiter = &limiter;

        std::thread::scope(|s| {
            for i in 0..8 {
                s.spawn(move || {
                    let key = format!("client-{}", i);
                    let admitted = (0..10).filter(|_| limiter.admit(&key)).count();
                    assert_eq!(admitted, 5);
                });
            }
        });

        assert_eq!(limiter.client_count(), 8);
    }
}
