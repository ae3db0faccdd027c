//! Turnstile - Per-Client Request Admission
//!
//! This crate decides, per request, whether a client identified by an opaque
//! key may proceed without exceeding a configured rate. Two strategies are
//! provided (fixed window and sliding window), selected by name through a
//! factory, plus a lazily-initialized process-wide default limiter.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{Result, TurnstileError};
pub use ratelimit::{admit, create, default_limiter, LimiterHandle, RateLimiter, StrategyKind};
