//! Read-through departure lookup.
//!
//! Composes the departure cache with an upstream [`DepartureSource`]:
//! cache hits never touch upstream, misses fetch, store with the configured
//! TTL, and return. Upstream failures are returned as-is and never cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::cache::{CacheConfig, DepartureCache};
use crate::rmv::RmvError;

/// A departure board as returned by upstream, shared read-only between the
/// cache and callers.
pub type Departures = Arc<Value>;

/// Something that can fetch a departure board for a stop.
pub trait DepartureSource: Send + Sync {
    fn fetch<'a>(&'a self, stop_id: &'a str) -> BoxFuture<'a, Result<Value, RmvError>>;
}

/// Per-stop gates used to coalesce concurrent misses.
#[derive(Default)]
struct InFlight {
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InFlight {
    fn gate(&self, stop_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.entry(stop_id.to_string()).or_default().clone()
    }
}

/// Cache-first departure lookup.
pub struct DepartureService {
    source: Arc<dyn DepartureSource>,
    cache: DepartureCache,
    ttl: Duration,
    in_flight: Option<InFlight>,
}

impl DepartureService {
    /// Create a new service. Concurrent misses each go upstream until
    /// [`with_coalescing`](Self::with_coalescing) is enabled.
    pub fn new(source: Arc<dyn DepartureSource>, cache_config: &CacheConfig) -> Self {
        Self {
            source,
            cache: DepartureCache::new(cache_config),
            ttl: cache_config.ttl,
            in_flight: None,
        }
    }

    /// Let one caller per stop fetch while concurrent callers for the same
    /// stop wait for its result.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::default);
        self
    }

    /// Get departures for a stop, from cache if fresh.
    pub async fn get_departures(&self, stop_id: &str) -> Result<Departures, RmvError> {
        if let Some(cached) = self.cache.get(stop_id).await {
            tracing::info!(stop_id, "cache hit");
            return Ok(cached);
        }

        let Some(in_flight) = &self.in_flight else {
            return self.fetch_and_store(stop_id).await;
        };

        let gate = in_flight.gate(stop_id);
        let _turn = gate.lock().await;

        // Whoever held the gate before us may have filled the cache.
        if let Some(cached) = self.cache.get(stop_id).await {
            tracing::debug!(stop_id, "served by coalesced fetch");
            return Ok(cached);
        }

        self.fetch_and_store(stop_id).await
    }

    async fn fetch_and_store(&self, stop_id: &str) -> Result<Departures, RmvError> {
        let board = Arc::new(self.source.fetch(stop_id).await?);
        self.cache.set(stop_id, board.clone(), self.ttl).await;
        tracing::info!(stop_id, "fetched new data");
        Ok(board)
    }

    /// Access the cache (for diagnostics and tests).
    pub fn cache(&self) -> &DepartureCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    /// Scripted upstream that counts calls.
    struct FakeSource {
        calls: AtomicUsize,
        status: Option<u16>,
        delay: Duration,
    }

    impl FakeSource {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status: None,
                delay: Duration::ZERO,
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status: Some(status),
                delay: Duration::ZERO,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status: None,
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DepartureSource for FakeSource {
        fn fetch<'a>(&'a self, stop_id: &'a str) -> BoxFuture<'a, Result<Value, RmvError>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                match self.status {
                    Some(status) => Err(RmvError::Status {
                        status,
                        message: "unavailable".into(),
                    }),
                    None => Ok(json!({"stop": stop_id, "fetch": n})),
                }
            })
        }
    }

    fn service(source: Arc<FakeSource>) -> DepartureService {
        DepartureService::new(source, &CacheConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn miss_fetches_once_then_hits() {
        let source = FakeSource::ok();
        let service = service(source.clone());

        let first = service.get_departures("900123456").await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(*first, json!({"stop": "900123456", "fetch": 0}));

        let second = service.get_departures("900123456").await.unwrap();
        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn refetches_after_ttl() {
        let source = FakeSource::ok();
        let service = DepartureService::new(
            source.clone(),
            &CacheConfig::default().with_ttl(Duration::from_secs(60)),
        );

        service.get_departures("900123456").await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        service.get_departures("900123456").await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        let board = service.get_departures("900123456").await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(board["fetch"], 1);
    }

    #[tokio::test]
    async fn stops_are_cached_separately() {
        let source = FakeSource::ok();
        let service = service(source.clone());

        service.get_departures("a").await.unwrap();
        service.get_departures("b").await.unwrap();
        service.get_departures("a").await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(service.cache().len().await, 2);
    }

    #[tokio::test]
    async fn upstream_failure_is_not_cached() {
        let source = FakeSource::failing(503);
        let service = service(source.clone());

        let err = service.get_departures("900123456").await.unwrap_err();
        assert!(matches!(err, RmvError::Status { status: 503, .. }));
        assert!(service.cache().get("900123456").await.is_none());
        assert_eq!(service.cache().len().await, 0);

        // No negative caching: the next call goes upstream again.
        service.get_departures("900123456").await.unwrap_err();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_each_fetch_by_default() {
        let source = FakeSource::slow(Duration::from_millis(100));
        let service = Arc::new(service(source.clone()));

        let requests = (0..5).map(|_| {
            let service = service.clone();
            async move { service.get_departures("900123456").await }
        });
        for result in futures::future::join_all(requests).await {
            result.unwrap();
        }

        assert_eq!(source.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn coalescing_shares_one_fetch() {
        let source = FakeSource::slow(Duration::from_millis(100));
        let service = Arc::new(service(source.clone()).with_coalescing(true));

        let requests = (0..5).map(|_| {
            let service = service.clone();
            async move { service.get_departures("900123456").await }
        });
        let boards: Vec<_> = futures::future::join_all(requests)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(source.calls(), 1);
        assert!(boards.iter().all(|b| Arc::ptr_eq(b, &boards[0])));
    }

    #[tokio::test(start_paused = true)]
    async fn coalescing_does_not_share_failures() {
        let source = FakeSource::failing(502);
        let service = Arc::new(service(source.clone()).with_coalescing(true));

        let requests = (0..3).map(|_| {
            let service = service.clone();
            async move { service.get_departures("900123456").await }
        });
        for result in futures::future::join_all(requests).await {
            assert!(result.is_err());
        }

        // Each waiter found the cache empty and tried upstream itself.
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn bounded_cache_serves_hits() {
        let source = FakeSource::ok();
        let service = DepartureService::new(
            source.clone(),
            &CacheConfig::default().with_max_entries(16),
        );

        service.get_departures("900123456").await.unwrap();
        service.get_departures("900123456").await.unwrap();
        assert_eq!(source.calls(), 1);
    }
}
