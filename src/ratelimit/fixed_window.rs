//! Fixed-window admission.
//!
//! Each client gets `max_requests` admissions per window. The window opens on
//! the first request after the previous one expired, so windows are anchored
//! per client rather than to wall-clock boundaries. A client can therefore see
//! up to twice the nominal rate across a window boundary.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::factory::StrategyKind;
use super::limiter::RateLimiter;

/// The active window for one client.
#[derive(Debug, Clone, Copy)]
struct WindowState {
    /// When the current window opened
    start: Instant,
    /// Requests admitted in the current window
    count: u32,
}

/// Rate limiter counting admissions in per-client fixed windows.
pub struct FixedWindowLimiter {
    clients: DashMap<String, WindowState>,
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    /// Create a new fixed-window limiter on the system clock.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    /// Create a new fixed-window limiter reading time from `clock`.
    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: DashMap::new(),
            max_requests,
            window,
            clock,
        }
    }

    fn record(&self, client_key: &str, state: &mut WindowState, now: Instant) -> bool {
        if now.saturating_duration_since(state.start) >= self.window {
            state.start = now;
            state.count = 0;
        }

        if state.count < self.max_requests {
            state.count += 1;
            trace!(
                client = client_key,
                count = state.count,
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

impl RateLimiter for FixedWindowLimiter {
    fn admit(&self, client_key: &str) -> bool {
        let now = self.clock.now();

        if let Some(mut state) = self.clients.get_mut(client_key) {
            return self.record(client_key, &mut state, now);
        }

        let mut state = self
            .clients
            .entry(client_key.to_owned())
            .or_insert_with(|| {
                debug!(client = client_key, "Opening first window for client");
                WindowState { start: now, count: 0 }
            });
        self.record(client_key, &mut state, now)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Fixed
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
        self.clients.retain(|_, state| {
            let live = now.saturating_duration_since(state.start) < self.window;
            if !live {
                evicted += 1;
            }
            live
        });
        evicted
    }

    fn clear(&self) {
        self.clients.clear();
    }
}
