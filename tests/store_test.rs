//! Tests for the response store: expiry, idempotent reads, merge.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::{Value, json};

use marketcache::cache::KeyFilter;
use marketcache::{CacheConfig, CacheKey, CacheStore, Classifier};

fn store_with_ttl(ttl: Duration) -> CacheStore {
    let config = CacheConfig::new().default_ttl(ttl);
    CacheStore::new(Arc::new(Classifier::new(&config).unwrap()), 1_000)
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn time_boxed_boundary_with_default_ttl() {
    let store = store_with_ttl(Duration::from_secs(300));
    let key = CacheKey::derive("/api/instruments", None);
    store.set(key.clone(), json!({"count": 42}));

    tokio::time::advance(Duration::from_secs(300) - Duration::from_millis(1)).await;
    assert_eq!(*store.get(&key).unwrap(), json!({"count": 42}));

    tokio::time::advance(Duration::from_millis(2)).await;
    assert!(store.get(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn push_refreshed_entries_never_expire() {
    let store = store_with_ttl(Duration::from_secs(1));
    let key = CacheKey::derive("/api/currency-strength", None);
    store.set(key.clone(), json!({"USD": 7.1}));

    tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
    assert_eq!(*store.get(&key).unwrap(), json!({"USD": 7.1}));
}

#[tokio::test(start_paused = true)]
async fn overwrite_resets_timestamp() {
    let store = store_with_ttl(Duration::from_secs(10));
    let key = CacheKey::derive("/api/instruments", None);
    store.set(key.clone(), json!(1));

    tokio::time::advance(Duration::from_secs(8)).await;
    store.set(key.clone(), json!(2));

    tokio::time::advance(Duration::from_secs(8)).await;
    assert_eq!(*store.get(&key).unwrap(), json!(2));
}

#[tokio::test(start_paused = true)]
async fn update_refreshes_timestamp() {
    let store = store_with_ttl(Duration::from_secs(10));
    let key = CacheKey::derive("/api/instruments", Some(r#"{"page":1}"#));
    store.set(key.clone(), json!("old"));

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(store.update(KeyFilter::Url("/api/instruments"), json!("new")), 1);

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(*store.get(&key).unwrap(), json!("new"));
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn repeated_reads_are_identical() {
    let store = store_with_ttl(Duration::from_secs(300));
    let key = CacheKey::derive("/api/retail-sentiment/dmx-positioning", Some(r#"{"symbol":"EURUSD"}"#));
    store.set(key.clone(), json!({"long": 61.5, "short": 38.5}));

    let first = store.get(&key).unwrap();
    for _ in 0..5 {
        assert_eq!(store.get(&key).unwrap(), first);
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn keys_differing_in_body_are_independent() {
    let store = store_with_ttl(Duration::from_secs(300));
    let eur = CacheKey::derive("/api/order-flow", Some(r#"{"symbol":"EURUSD"}"#));
    let gbp = CacheKey::derive("/api/order-flow", Some(r#"{"symbol":"GBPUSD"}"#));
    store.set(eur.clone(), json!("eur"));
    store.set(gbp.clone(), json!("gbp"));

    assert_eq!(store.invalidate("/api/order-flow"), 2);
    assert!(store.get(&eur).is_none());
    assert!(store.get(&gbp).is_none());
}

// ============================================================================
// Merge
// ============================================================================

fn add_field(name: &'static str, value: i64) -> impl Fn(&Value) -> Value {
    move |prev| {
        let mut next = prev.clone();
        next[name] = json!(value);
        next
    }
}

#[test]
fn sequential_merges_compose() {
    let filter_re = Regex::new("/api/currency-strength").unwrap();
    let seed = json!({"USD": 5});
    let key = CacheKey::derive("/api/currency-strength", None);

    let a = store_with_ttl(Duration::from_secs(300));
    a.set(key.clone(), seed.clone());
    let f = add_field("EUR", 3);
    let g = add_field("USD", 8);
    a.merge(KeyFilter::Pattern(&filter_re), &f);
    a.merge(KeyFilter::Pattern(&filter_re), &g);

    let b = store_with_ttl(Duration::from_secs(300));
    b.set(key.clone(), seed);
    b.merge(KeyFilter::Pattern(&filter_re), |prev| g(&f(prev)));

    assert_eq!(a.get(&key), b.get(&key));
    assert_eq!(*a.get(&key).unwrap(), json!({"USD": 8, "EUR": 3}));
}

#[test]
fn merge_without_matches_is_noop() {
    let store = store_with_ttl(Duration::from_secs(300));
    let re = Regex::new("/api/news").unwrap();
    assert_eq!(store.merge(KeyFilter::Pattern(&re), |_| json!("x")), 0);
    assert!(store.is_empty());
}

#[test]
fn clear_empties_store() {
    let store = store_with_ttl(Duration::from_secs(300));
    for i in 0..10 {
        store.set(CacheKey::derive("/api/instruments", Some(&format!("{{\"page\":{i}}}"))), json!(i));
    }
    assert_eq!(store.stats().size, 10);
    store.clear();
    assert!(store.is_empty());
    assert!(store.stats().keys.is_empty());
}
