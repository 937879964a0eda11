//! Response Cache (spec.md §4.8): a TTL- and capacity-bounded cache over
//! upstream reads, with single-flight coalescing so concurrent requests for
//! the same resource only hit upstream once.
//!
//! The capacity-bounded store is `moka`'s synchronous cache; the
//! coalescing layer on top is hand-rolled, since moka has no notion of an
//! in-flight (not-yet-resolved) entry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use http::HeaderMap;
use moka::sync::Cache as MokaCache;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::ProxyError;

/// A cache key combining a plaintext resource-type prefix (so writes can
/// invalidate by prefix without reversing a hash) with a hash of the
/// request path and the caller's relevant auth header, so two callers
/// with different credentials never share a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(resource_type: &str, request_path: &str, headers: &HeaderMap) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request_path.as_bytes());
        hasher.update(b"\0");
        if let Some(auth) = headers.get(http::header::AUTHORIZATION) {
            hasher.update(auth.as_bytes());
        }
        CacheKey(format!(
            "{}:{:x}",
            resource_type.to_ascii_lowercase(),
            hasher.finalize()
        ))
    }
}

type InFlight = Shared<BoxFuture<'static, Result<Value, Arc<ProxyError>>>>;

/// The Response Cache. Cloning is cheap; every clone shares the same
/// underlying store and in-flight map.
#[derive(Clone)]
pub struct ResponseCache {
    store: MokaCache<CacheKey, Value>,
    in_flight: Arc<AsyncMutex<HashMap<CacheKey, InFlight>>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_size: u64) -> Self {
        let store = MokaCache::builder()
            .time_to_live(ttl)
            .max_capacity(max_size)
            .support_invalidation_closures()
            .build();
        Self {
            store,
            in_flight: Arc::new(AsyncMutex::new(HashMap::new())),
        }
    }

    /// Look up `key`; on a miss, run `fetch` exactly once even if several
    /// callers race on the same key, and cache the result on success.
    /// Failures are never cached, but concurrent callers share the one
    /// attempt's outcome, so a single slow or failing upstream call never
    /// becomes N calls under load.
    pub async fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<Value, Arc<ProxyError>>
    where
        F: Future<Output = Result<Value, ProxyError>> + Send + 'static,
    {
        if let Some(cached) = self.store.get(&key) {
            log::debug!("cache hit {key:?}");
            return Ok(cached);
        }

        let mut in_flight = self.in_flight.lock().await;
        if let Some(existing) = in_flight.get(&key).cloned() {
            drop(in_flight);
            log::debug!("cache miss {key:?}, joining in-flight fetch");
            return existing.await;
        }
        log::debug!("cache miss {key:?}, fetching");

        let store = self.store.clone();
        let in_flight_map = self.in_flight.clone();
        let cleanup_key = key.clone();
        let insert_key = key.clone();

        let shared: InFlight = async move {
            let result = fetch.await.map_err(Arc::new);
            if let Ok(value) = &result {
                store.insert(insert_key, value.clone());
            }
            in_flight_map.lock().await.remove(&cleanup_key);
            result
        }
        .boxed()
        .shared();

        in_flight.insert(key, shared.clone());
        drop(in_flight);
        shared.await
    }

    /// Drop every cached entry for `resource_type`, called after a write
    /// so stale list/get responses for that type aren't served.
    pub fn invalidate_resource_type(&self, resource_type: &str) {
        let prefix = format!("{}:", resource_type.to_ascii_lowercase());
        let result = self
            .store
            .invalidate_entries_if(move |key: &CacheKey, _| key.0.starts_with(&prefix));
        match result {
            Ok(()) => log::info!("invalidated cache entries for {resource_type}"),
            Err(error) => log::warn!("cache invalidation predicate rejected: {error}"),
        }
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> u64 {
        self.store.run_pending_tasks();
        self.store.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn caches_successful_fetch() {
        let cache = ResponseCache::new(Duration::from_secs(30), 100);
        let key = CacheKey::new("Users", "/Users/1", &HeaderMap::new());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = cache
                .get_or_fetch(key.clone(), async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(serde_json::json!({"id": "1"}))
                })
                .await
                .unwrap();
            assert_eq!(value, serde_json::json!({"id": "1"}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_into_one_fetch() {
        let cache = ResponseCache::new(Duration::from_secs(30), 100);
        let key = CacheKey::new("Users", "/Users/1", &HeaderMap::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(key, async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(StdDuration::from_millis(20)).await;
                        Ok(serde_json::json!({"id": "1"}))
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ResponseCache::new(Duration::from_secs(30), 100);
        let key = CacheKey::new("Users", "/Users/1", &HeaderMap::new());

        let first = cache
            .get_or_fetch(key.clone(), async { Err(ProxyError::internal("boom")) })
            .await;
        assert!(first.is_err());

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let second = cache
            .get_or_fetch(key, async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::json!({"id": "1"}))
            })
            .await;
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keys_differ_by_auth_header() {
        let mut headers_a = HeaderMap::new();
        headers_a.insert("authorization", "Bearer a".parse().unwrap());
        let mut headers_b = HeaderMap::new();
        headers_b.insert("authorization", "Bearer b".parse().unwrap());

        let key_a = CacheKey::new("Users", "/Users/1", &headers_a);
        let key_b = CacheKey::new("Users", "/Users/1", &headers_b);
        assert_ne!(key_a, key_b);
    }
}
