//! In-memory caching for departure boards.
//!
//! The default backend is an unbounded map with lazy expiry, sized for a
//! handful of stops per process. Setting `max_entries` switches to a
//! capacity-bounded backend with the same contract.

mod bounded;
mod ttl;

use std::time::Duration;

pub use bounded::BoundedCache;
pub use ttl::{CacheEntry, TtlCache};

use crate::departures::Departures;

/// Default TTL for cached boards (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied to every board fetched from upstream.
    pub ttl: Duration,

    /// Maximum number of cached stops. `None` keeps every key until it is
    /// overwritten.
    pub max_entries: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    /// Set the TTL for cached boards.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bound the cache to `n` entries.
    pub fn with_max_entries(mut self, n: u64) -> Self {
        self.max_entries = Some(n);
        self
    }
}

/// Departure board cache, keyed by stop identifier.
pub enum DepartureCache {
    Lazy(TtlCache<Departures>),
    Bounded(BoundedCache<Departures>),
}

impl DepartureCache {
    /// Create the backend selected by `config`.
    pub fn new(config: &CacheConfig) -> Self {
        match config.max_entries {
            Some(n) => DepartureCache::Bounded(BoundedCache::new(n)),
            None => DepartureCache::Lazy(TtlCache::new()),
        }
    }

    pub async fn get(&self, stop_id: &str) -> Option<Departures> {
        match self {
            DepartureCache::Lazy(cache) => cache.get(stop_id).await,
            DepartureCache::Bounded(cache) => cache.get(stop_id).await,
        }
    }

    pub async fn set(&self, stop_id: &str, departures: Departures, ttl: Duration) {
        match self {
            DepartureCache::Lazy(cache) => cache.set(stop_id, departures, ttl).await,
            DepartureCache::Bounded(cache) => cache.set(stop_id, departures, ttl).await,
        }
    }

    /// Number of stored entries (for tests and diagnostics).
    pub async fn len(&self) -> u64 {
        match self {
            DepartureCache::Lazy(cache) => cache.len().await as u64,
            DepartureCache::Bounded(cache) => cache.len().await,
        }
    }
}
