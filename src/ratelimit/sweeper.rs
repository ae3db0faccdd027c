//! Background eviction of expired client state.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::limiter::LimiterHandle;

/// Shortest interval the sweeper will run at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn a task that calls [`evict_expired`] on `limiter` every `interval`.
///
/// Must be called from within a tokio runtime. The task runs until the
/// returned handle is aborted.
///
/// [`evict_expired`]: super::RateLimiter::evict_expired
pub fn spawn_sweeper(limiter: LimiterHandle, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        debug!(
            strategy = %limiter.kind(),
            interval_ms = interval.as_millis() as u64,
            "Sweeper started"
        );

        loop {
            ticker.tick().await;

            let evicted = limiter.evict_expired();
            if evicted > 0 {
                debug!(
                    evicted = evicted,
                    remaining = limiter.client_count(),
                    "Evicted expired client state"
                );
            } else {
                trace!(remaining = limiter.client_count(), "Sweep found nothing to evict");
            }
        }
    })
}
