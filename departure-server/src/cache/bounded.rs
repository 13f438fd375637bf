//! Capacity-bounded TTL cache backed by moka.
//!
//! Same `get`/`set(key, value, ttl)` contract as [`super::TtlCache`], but
//! the number of entries is capped and expired entries are reclaimed.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache as MokaCache;

/// Stored value plus the TTL it was inserted with.
#[derive(Debug, Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry after the TTL it was inserted with.
struct PerEntryTtl;

impl<V> Expiry<String, Timed<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Timed<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// TTL cache holding at most `max_entries` keys.
pub struct BoundedCache<V> {
    entries: MokaCache<String, Timed<V>>,
}

impl<V: Clone + Send + Sync + 'static> BoundedCache<V> {
    pub fn new(max_entries: u64) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await.map(|timed| timed.value)
    }

    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(key.into(), Timed { value, ttl }).await;
    }

    /// Number of live entries after pending maintenance has run.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
