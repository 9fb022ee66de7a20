pub mod config;
pub mod limiter;

pub use config::{RateLimitConfig, RateLimitErrorBehavior};
pub use limiter::{RateLimitResult, RateLimiter};
