//! Construction of rate limiters by strategy name.
//!
//! The registry below is the single extension point for new strategies: a new
//! strategy implements [`RateLimiter`](super::RateLimiter), gains a [`StrategyKind`] variant and a
//! row in `REGISTRY`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::clock::{Clock, SystemClock};
use super::fixed_window::FixedWindowLimiter;
use super::limiter::LimiterHandle;
use super::sliding_window::SlidingWindowLimiter;
use crate::error::{Result, TurnstileError};

/// Immutable parameters of a limiter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Length of the window
    pub window: Duration,
}

impl LimiterSettings {
    /// Settings from a request count and a window length in milliseconds.
    pub fn new(max_requests: u32, window_size_ms: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_millis(window_size_ms),
        }
    }
}

/// The available admission strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StrategyKind {
    /// Per-client fixed windows
    Fixed,
    /// Per-client sliding log
    Sliding,
}

type Constructor = fn(LimiterSettings, Arc<dyn Clock>) -> LimiterHandle;

fn build_fixed(settings: LimiterSettings, clock: Arc<dyn Clock>) -> LimiterHandle {
    Arc::new(FixedWindowLimiter::with_clock(
        settings.max_requests,
        settings.window,
        clock,
    ))
}

fn build_sliding(settings: LimiterSettings, clock: Arc<dyn Clock>) -> LimiterHandle {
    Arc::new(SlidingWindowLimiter::with_clock(
        settings.max_requests,
        settings.window,
        clock,
    ))
}

/// Normalized name, kind and constructor for every registered strategy.
const REGISTRY: &[(&str, StrategyKind, Constructor)] = &[
    ("fixed", StrategyKind::Fixed, build_fixed as Constructor),
    ("sliding", StrategyKind::Sliding, build_sliding as Constructor),
];

impl StrategyKind {
    /// The canonical (lowercase) name of this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::Sliding => "sliding",
        }
    }

    /// Build a limiter of this kind. Never fails.
    pub fn build(self, settings: LimiterSettings, clock: Arc<dyn Clock>) -> LimiterHandle {
        let (_, _, construct) = REGISTRY
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .copied()
            .unwrap_or_else(|| unreachable!("every strategy kind has a registry entry"));
        construct(settings, clock)
    }
}

impl FromStr for StrategyKind {
    type Err = TurnstileError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|(name, _, _)| *name == normalized)
            .map(|(_, kind, _)| *kind)
            .ok_or_else(|| TurnstileError::InvalidArgument(s.to_string()))
    }
}

impl TryFrom<String> for StrategyKind {
    type Error = TurnstileError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StrategyKind> for String {
    fn from(kind: StrategyKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create a limiter on the system clock.
///
/// `kind` is matched case-insensitively against the registered strategy names.
/// An unknown name fails with [`TurnstileError::InvalidArgument`] carrying the
/// string exactly as given.
pub fn create(kind: &str, max_requests: u32, window_size_ms: u64) -> Result<LimiterHandle> {
    create_with_clock(kind, max_requests, window_size_ms, Arc::new(SystemClock))
}

/// Create a limiter reading time from `clock`.
pub fn create_with_clock(
    kind: &str,
    max_requests: u32,
    window_size_ms: u64,
    clock: Arc<dyn Clock>,
) -> Result<LimiterHandle> {
    let kind: StrategyKind = kind.parse()?;
    let limiter = kind.build(LimiterSettings::new(max_requests, window_size_ms), clock);

    info!(
        strategy = %kind,
        max_requests = limiter.max_requests(),
        window_ms = window_size_ms,
        "Rate limiter created"
    );

    Ok(limiter)
}
