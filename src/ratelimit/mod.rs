//! Rate limiting strategies and their construction.

mod clock;
mod factory;
mod fixed_window;
mod limiter;
mod shared;
mod sliding_window;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use factory::{create, create_with_clock, LimiterSettings, StrategyKind};
pub use fixed_window::FixedWindowLimiter;
pub use limiter::{LimiterHandle, RateLimiter};
pub use shared::{admit, default_limiter, DEFAULT_MAX_REQUESTS, DEFAULT_STRATEGY, DEFAULT_WINDOW_MS};
pub use sliding_window::SlidingWindowLimiter;
pub use sweeper::spawn_sweeper;
