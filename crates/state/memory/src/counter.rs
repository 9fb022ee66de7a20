use async_trait::async_trait;
use dashmap::DashMap;

use roombook_state::counter::{Bucket, CounterStore};
use roombook_state::error::StateError;

/// In-process [`CounterStore`] backed by a [`DashMap`].
///
/// Buckets live for the lifetime of the process and are not shared across
/// instances.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    buckets: DashMap<String, Bucket>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<Bucket, StateError> {
        // The entry guard holds the shard lock, so read-modify-write is atomic.
        let mut entry = self.buckets.entry(key.to_owned()).or_insert(Bucket {
            count: 0,
            window_start_ms: now_ms,
        });
        if now_ms - entry.window_start_ms >= window_ms {
            entry.count = 0;
            entry.window_start_ms = now_ms;
        }
        entry.count += 1;
        Ok(*entry)
    }

    async fn prune(&self, now_ms: i64, window_ms: i64) -> Result<usize, StateError> {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| now_ms - b.window_start_ms < window_ms);
        Ok(before.saturating_sub(self.buckets.len()))
    }
}
