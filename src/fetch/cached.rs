//! Caching decorator over a [`Fetch`] origin.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ApiRequest, ApiResponse, Fetch};
use crate::Result;
use crate::cache::{CacheKey, CacheStore};
use crate::config::DEFAULT_API_PREFIX;
use crate::telemetry;

/// Decorator that serves cacheable requests from a [`CacheStore`].
///
/// For each request:
///
/// 1. Paths outside the API prefix pass straight through.
/// 2. Non GET/POST methods, never-cache URLs and binary bodies pass
///    through without touching the store.
/// 3. A store hit returns a synthesized `200` JSON response; no network call.
/// 4. A miss calls the origin; a 2xx response whose body parses as JSON is
///    written to the store. The origin's response is returned unmodified.
///
/// The origin is fixed at construction. The decorator never looks itself
/// up, so wrapping a `CachedFetcher` in another one cannot recurse.
pub struct CachedFetcher {
    origin: Arc<dyn Fetch>,
    store: Arc<CacheStore>,
    api_prefix: String,
    in_flight: Option<moka::sync::Cache<CacheKey, Arc<Mutex<()>>>>,
}

impl CachedFetcher {
    /// Wrap `origin`, caching into `store`.
    pub fn new(origin: Arc<dyn Fetch>, store: Arc<CacheStore>) -> Self {
        Self {
            origin,
            store,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            in_flight: None,
        }
    }

    /// Set the path prefix of cacheable API routes.
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Collapse concurrent cold requests for the same key.
    ///
    /// Followers wait for the leader, then read the store; they receive the
    /// same synthesized response as any other hit. A lock lives in the map
    /// from the first cold request until the origin call completes, however
    /// long that takes.
    pub fn dedupe_in_flight(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(|| moka::sync::Cache::builder().build());
        self
    }

    /// The store this fetcher reads and writes.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    fn is_api_route(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed.path().starts_with(&self.api_prefix),
            Err(_) => url.starts_with(&self.api_prefix),
        }
    }

    async fn passthrough(&self, request: ApiRequest, reason: &'static str) -> Result<ApiResponse> {
        debug!(url = %request.url, method = %request.method, reason, "cache bypass");
        metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => "bypass").increment(1);
        self.origin.fetch(request).await
    }

    fn hit(&self, key: &CacheKey, payload: &Value) -> ApiResponse {
        debug!(key = %key, "cache hit");
        metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => "hit").increment(1);
        ApiResponse::from_payload(payload)
    }
}

#[async_trait]
impl Fetch for CachedFetcher {
    fn name(&self) -> &str {
        "cached"
    }

    async fn fetch(&self, request: ApiRequest) -> Result<ApiResponse> {
        if !self.is_api_route(&request.url) {
            return self.passthrough(request, "route").await;
        }

        let policy = self
            .store
            .classifier()
            .classify_request(&request.method, &request.url);
        if policy.is_never() {
            return self.passthrough(request, "policy").await;
        }

        let Some(key) = request.cache_key() else {
            return self.passthrough(request, "body").await;
        };

        if let Some(payload) = self.store.get(&key) {
            return Ok(self.hit(&key, &payload));
        }

        // Held until the store write below, so followers see the result.
        let _guard = match &self.in_flight {
            Some(locks) => {
                let lock = locks.get_with(key.clone(), || Arc::new(Mutex::new(())));
                let guard = lock.lock_owned().await;
                if let Some(payload) = self.store.get(&key) {
                    return Ok(self.hit(&key, &payload));
                }
                Some(guard)
            }
            None => None,
        };

        debug!(key = %key, policy = policy.label(), origin = self.origin.name(), "cache miss");
        metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => "miss").increment(1);

        let result = self.origin.fetch(request).await;
        if let Ok(response) = &result
            && response.is_success()
        {
            match serde_json::from_slice::<Value>(response.body()) {
                Ok(payload) => {
                    self.store.set(key.clone(), payload);
                    metrics::counter!(telemetry::STORE_WRITES_TOTAL, "source" => "fetch")
                        .increment(1);
                }
                Err(e) => debug!(key = %key, error = %e, "non-JSON response, not cached"),
            }
        }
        // Waiters already hold the lock's Arc; later requests see the store.
        if let Some(locks) = &self.in_flight {
            locks.invalidate(&key);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use serde_json::json;

    use super::*;
    use crate::CacheError;
    use crate::cache::Classifier;

    struct Origin {
        fail: bool,
    }

    #[async_trait]
    impl Fetch for Origin {
        fn name(&self) -> &str {
            "origin"
        }

        async fn fetch(&self, _request: ApiRequest) -> Result<ApiResponse> {
            if self.fail {
                return Err(CacheError::Http("connection reset".into()));
            }
            let body = json!({"net": 1}).to_string().into_bytes();
            Ok(ApiResponse::new(StatusCode::OK, HeaderMap::new(), body))
        }
    }

    fn fetcher(fail: bool) -> CachedFetcher {
        let store = Arc::new(CacheStore::new(Arc::new(Classifier::default()), 100));
        CachedFetcher::new(Arc::new(Origin { fail }), store).dedupe_in_flight(true)
    }

    fn held_locks(fetcher: &CachedFetcher) -> usize {
        fetcher.in_flight.as_ref().map_or(0, |locks| locks.iter().count())
    }

    #[tokio::test]
    async fn lock_is_released_after_store_write() {
        let fetcher = fetcher(false);
        fetcher.fetch(ApiRequest::get("/api/cot-report")).await.unwrap();
        assert_eq!(held_locks(&fetcher), 0);
        assert_eq!(fetcher.store().len(), 1);
    }

    #[tokio::test]
    async fn lock_is_released_after_origin_error() {
        let fetcher = fetcher(true);
        assert!(fetcher.fetch(ApiRequest::get("/api/cot-report")).await.is_err());
        assert_eq!(held_locks(&fetcher), 0);
        assert!(fetcher.store().is_empty());
    }
}
