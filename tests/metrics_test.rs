//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::json;

use marketcache::fetch::{ApiRequest, ApiResponse, Fetch};
use marketcache::push::Channel;
use marketcache::{CacheKey, MarketCache, Result, telemetry};

// ============================================================================
// Mock origin
// ============================================================================

struct StaticOrigin;

#[async_trait]
impl Fetch for StaticOrigin {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _request: ApiRequest) -> Result<ApiResponse> {
        Ok(ApiResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            br#"{"ok":true}"#.to_vec(),
        ))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum counter values with the given name and `label = value`.
fn counter_with(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn interception_outcomes_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let cache = MarketCache::builder().build().unwrap();
                let fetcher = cache.wrap(Arc::new(StaticOrigin));

                // miss, hit, bypass (method), bypass (never-cache)
                fetcher.fetch(ApiRequest::get("/api/news")).await.unwrap();
                fetcher.fetch(ApiRequest::get("/api/news")).await.unwrap();
                fetcher
                    .fetch(ApiRequest::new(Method::DELETE, "/api/news"))
                    .await
                    .unwrap();
                fetcher
                    .fetch(ApiRequest::post("/api/auth/login"))
                    .await
                    .unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let requests = telemetry::REQUESTS_TOTAL;
    assert_eq!(counter_with(&snapshot, requests, "outcome", "miss"), 1);
    assert_eq!(counter_with(&snapshot, requests, "outcome", "hit"), 1);
    assert_eq!(counter_with(&snapshot, requests, "outcome", "bypass"), 2);
    assert_eq!(
        counter_with(&snapshot, telemetry::STORE_WRITES_TOTAL, "source", "fetch"),
        1
    );
}

#[test]
fn push_events_and_errors_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let cache = MarketCache::builder().build().unwrap();
        let key = CacheKey::derive("/api/order-flow", None);
        cache
            .push()
            .prime(Channel::OrderFlow, key, json!({"bid": 1}))
            .unwrap();
        cache.push().update(Channel::OrderFlow, json!({"bid": 2}));
        cache.push().invalidate(Channel::OrderFlow);
        let _ = cache.push().apply_json(r#"{"channel":"nope"}"#);
        let _ = cache.push().apply_json("not json");
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with(&snapshot, telemetry::PUSH_EVENTS_TOTAL, "channel", "order-flow"),
        2
    );
    assert_eq!(
        counter_with(&snapshot, telemetry::STORE_WRITES_TOTAL, "source", "push"),
        2
    );
    assert_eq!(
        counter_with(&snapshot, telemetry::EVICTIONS_TOTAL, "reason", "invalidated"),
        1
    );
    assert_eq!(
        counter_with(&snapshot, telemetry::PUSH_ERRORS_TOTAL, "reason", "unknown_channel"),
        1
    );
    assert_eq!(
        counter_with(&snapshot, telemetry::PUSH_ERRORS_TOTAL, "reason", "malformed"),
        1
    );
}

#[test]
fn no_recorder_is_a_noop() {
    let cache = MarketCache::builder().build().unwrap();
    cache.push().update(Channel::NewsFeed, json!([]));
    assert!(cache.store().is_empty());
}
