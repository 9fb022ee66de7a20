use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Request counters for the gateway, updated with relaxed ordering.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Requests that reached the gateway after the HTTP guards.
    pub requests: AtomicU64,
    pub legacy_forwards: AtomicU64,
    pub managed_calls: AtomicU64,
    /// Admin code exchanges answered locally.
    pub local_calls: AtomicU64,
    pub policy_rejections: AtomicU64,
    /// Requests refused by the rate limiter.
    pub throttled: AtomicU64,
    /// Upstream or datastore failures surfaced as 502.
    pub transport_errors: AtomicU64,
    /// Replies with `success: false`.
    pub business_failures: AtomicU64,
}

impl GatewayMetrics {
    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_legacy_forwards(&self) {
        self.legacy_forwards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_managed_calls(&self) {
        self.managed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_local_calls(&self) {
        self.local_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_policy_rejections(&self) {
        self.policy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transport_errors(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_business_failures(&self) {
        self.business_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            legacy_forwards: self.legacy_forwards.load(Ordering::Relaxed),
            managed_calls: self.managed_calls.load(Ordering::Relaxed),
            local_calls: self.local_calls.load(Ordering::Relaxed),
            policy_rejections: self.policy_rejections.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            business_failures: self.business_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub legacy_forwards: u64,
    pub managed_calls: u64,
    pub local_calls: u64,
    pub policy_rejections: u64,
    pub throttled: u64,
    pub transport_errors: u64,
    pub business_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = GatewayMetrics::default();
        m.increment_requests();
        m.increment_requests();
        m.increment_throttled();
        m.increment_managed_calls();
        let snap = m.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.throttled, 1);
        assert_eq!(snap.managed_calls, 1);
        assert_eq!(snap.legacy_forwards, 0);
    }
}
