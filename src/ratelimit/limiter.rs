//! Rate limiter trait shared by every admission strategy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::factory::StrategyKind;

/// Trait for rate limiter implementations.
///
/// Implementations keep per-client state keyed by an opaque client string and
/// must be safe to call concurrently for the same and for different keys.
pub trait RateLimiter: Send + Sync {
    /// Decide whether a request from `client_key` is admitted.
    ///
    /// Returns `true` and records the request when the client is within its
    /// budget, `false` otherwise. Any key, including the empty string, is valid.
    fn admit(&self, client_key: &str) -> bool;

    /// The strategy this limiter implements.
    fn kind(&self) -> StrategyKind;

    /// Requests allowed per window.
    fn max_requests(&self) -> u32;

    /// Length of the window.
    fn window(&self) -> Duration;

    /// Number of clients currently holding state.
    fn client_count(&self) -> usize;

    /// Drop client entries whose state has fully expired.
    ///
    /// An evicted entry is indistinguishable from a client that was never
    /// seen, so this never changes a later decision. Returns the number of
    /// entries removed.
    fn evict_expired(&self) -> usize;

    /// Drop all client state.
    fn clear(&self);
}

/// Shared handle over any rate limiter.
pub type LimiterHandle = Arc<dyn RateLimiter>;

impl fmt::Debug for dyn RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("kind", &self.kind())
            .field("max_requests", &self.max_requests())
            .field("window", &self.window())
            .field("clients", &self.client_count())
            .finish()
    }
}
