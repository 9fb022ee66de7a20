use std::sync::Arc;

use roombook_gateway::Clock;
use roombook_state::CounterStore;

use super::config::{RateLimitConfig, RateLimitErrorBehavior};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// Whole seconds until the window resets, set when rejected.
    pub retry_after: Option<u64>,
}

/// Fixed-window limiter keyed by `address|method`.
///
/// Buckets live in a [`CounterStore`]; with the in-memory store the limit is
/// per process. Swapping in a shared store changes nothing here.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    max_requests: u64,
    window_ms: i64,
    on_error: RateLimitErrorBehavior,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
        config: &RateLimitConfig,
    ) -> Self {
        let window_secs = i64::try_from(config.window_seconds.max(1)).unwrap_or(i64::MAX / 1000);
        Self {
            store,
            clock,
            max_requests: config.max_requests,
            window_ms: window_secs.saturating_mul(1000),
            on_error: config.on_error,
        }
    }

    pub fn bucket_key(address: &str, method: &str) -> String {
        format!("{address}|{method}")
    }

    /// Record a request from `address` with `method` at the current time.
    pub async fn check(&self, address: &str, method: &str) -> RateLimitResult {
        let now_ms = self.clock.now().timestamp_millis();
        self.check_at(address, method, now_ms).await
    }

    /// Record a request at `now_ms` (epoch milliseconds).
    pub async fn check_at(&self, address: &str, method: &str, now_ms: i64) -> RateLimitResult {
        let key = Self::bucket_key(address, method);
        let bucket = match self.store.hit(&key, now_ms, self.window_ms).await {
            Ok(bucket) => bucket,
            Err(e) => {
                tracing::warn!(error = %e, "rate limiter: counter store failed");
                return self.handle_store_error();
            }
        };

        if bucket.count > self.max_requests {
            let elapsed = now_ms.saturating_sub(bucket.window_start_ms).max(0);
            let left_ms = (self.window_ms - elapsed).max(0);
            let retry = u64::try_from((left_ms + 999) / 1000).unwrap_or(1).max(1);
            tracing::debug!(%key, count = bucket.count, retry, "rate limit exceeded");
            return RateLimitResult {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                retry_after: Some(retry),
            };
        }

        RateLimitResult {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - bucket.count,
            retry_after: None,
        }
    }

    /// Drop buckets whose window has passed.
    pub async fn prune(&self) -> usize {
        let now_ms = self.clock.now().timestamp_millis();
        match self.store.prune(now_ms, self.window_ms).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "rate limiter: prune failed");
                0
            }
        }
    }

    fn handle_store_error(&self) -> RateLimitResult {
        match self.on_error {
            RateLimitErrorBehavior::Allow => RateLimitResult {
                allowed: true,
                limit: self.max_requests,
                remaining: self.max_requests,
                retry_after: None,
            },
            RateLimitErrorBehavior::Deny => RateLimitResult {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                retry_after: Some(u64::try_from(self.window_ms / 1000).unwrap_or(60)),
            },
        }
    }
}
