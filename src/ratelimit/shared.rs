//! Process-wide default limiter.
//!
//! Callers that do not need their own parameters can share one sliding-window
//! limiter (100 requests per 6 seconds). It is built on first use, exactly
//! once, no matter how many threads race to that first use. Callers needing
//! other parameters should build their own limiter through [`create`].
//!
//! [`create`]: super::create

use std::sync::{Arc, OnceLock};
use tracing::info;

use super::clock::SystemClock;
use super::factory::{LimiterSettings, StrategyKind};
use super::limiter::LimiterHandle;

/// Strategy of the default limiter.
pub const DEFAULT_STRATEGY: StrategyKind = StrategyKind::Sliding;
/// Requests per window of the default limiter.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;
/// Window length of the default limiter, in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 6000;

static DEFAULT_LIMITER: OnceLock<LimiterHandle> = OnceLock::new();

/// Return the limiter in `cell`, running `construct` only if the cell is empty.
///
/// Concurrent first callers block until the single winning construction
/// completes, then all observe that same instance.
fn get_or_build<F>(cell: &OnceLock<LimiterHandle>, construct: F) -> &LimiterHandle
where
    F: FnOnce() -> LimiterHandle,
{
    cell.get_or_init(construct)
}

fn shared() -> &'static LimiterHandle {
    get_or_build(&DEFAULT_LIMITER, || {
        info!(
            strategy = %DEFAULT_STRATEGY,
            max_requests = DEFAULT_MAX_REQUESTS,
            window_ms = DEFAULT_WINDOW_MS,
            "Initializing default rate limiter"
        );
        DEFAULT_STRATEGY.build(
            LimiterSettings::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS),
            Arc::new(SystemClock),
        )
    })
}

/// Handle to the process-wide default limiter.
///
/// Every call returns the same instance.
pub fn default_limiter() -> LimiterHandle {
    Arc::clone(shared())
}

/// Admission decision from the process-wide default limiter.
pub fn admit(client_key: &str) -> bool {
    shared().admit(client_key)
}
