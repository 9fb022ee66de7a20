use async_trait::async_trait;

use crate::error::StateError;

/// A fixed-window hit counter after one recorded hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Hits in the current window, including the one just recorded.
    pub count: u64,
    /// Epoch milliseconds at which the current window opened.
    pub window_start_ms: i64,
}

/// Backing store for rate-limit buckets.
///
/// The in-process implementation is best-effort per instance. A shared
/// implementation (atomic increment with expiry) can be substituted without
/// changing the limiter policy.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one hit for `key` at `now_ms`.
    ///
    /// Opens a fresh window with `count = 1` when none exists or when
    /// `now_ms - window_start_ms >= window_ms`; otherwise increments.
    async fn hit(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<Bucket, StateError>;

    /// Drop buckets whose window has fully elapsed. Returns how many were removed.
    async fn prune(&self, now_ms: i64, window_ms: i64) -> Result<usize, StateError> {
        let _ = (now_ms, window_ms);
        Ok(0)
    }
}
