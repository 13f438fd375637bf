//! Unbounded TTL map with lazy expiry.
//!
//! Entries are never swept. An expired entry is reported as absent by
//! [`TtlCache::get`] and stays in the map until a later `set` for the same
//! key replaces it.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Stand-in deadline for TTLs too large to add to an `Instant` (~30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A cached value together with the instant it stops being valid.
///
/// Entries are replaced wholesale, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create an entry that expires `ttl` after `now`, or effectively never
    /// if `now + ttl` overflows.
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { value, expires_at }
    }

    /// Whether the entry is still valid at `now`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Concurrent key-value store with per-entry expiry.
///
/// Readers share the lock; writers take it exclusively for the whole map.
/// The lock is only held for the map operation itself.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a value, treating expired entries as absent.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value.clone())
    }

    /// Insert or replace the entry for `key`, valid for `ttl` from now.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, Instant::now(), ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
