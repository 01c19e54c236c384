//! In-memory response store.
//!
//! [`CacheStore`] maps [`CacheKey`]s to JSON payloads with a write timestamp.
//! The store does not remember which policy produced an entry: expiry is
//! decided on every [`get`](CacheStore::get) by re-classifying the key's URL,
//! so a classifier change applies to entries already in the store.
//!
//! Time-boxed entries expire lazily on read; there is no sweeper. Dead
//! entries linger until they are read or pushed out by the capacity bound.
//! The bound evicts least-recently-used entries and always admits new
//! writes.
//!
//! Pattern operations (`update`, `merge`, `invalidate_by_pattern`) scan all
//! live keys and are O(n). None of the operations fail; payload shape is the
//! caller's concern.

use std::sync::Arc;

use moka::ops::compute::{CompResult, Op};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use super::key::CacheKey;
use super::policy::{CachePolicy, Classifier};
use crate::telemetry;

/// A stored payload and when it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Arc<Value>,
    pub written_at: Instant,
}

impl CacheEntry {
    fn fresh(payload: Arc<Value>) -> Self {
        Self {
            payload,
            written_at: Instant::now(),
        }
    }
}

/// Selects entries by the URL part of their key.
#[derive(Debug, Clone, Copy)]
pub enum KeyFilter<'a> {
    /// URL equals this literal exactly.
    Url(&'a str),
    /// URL matches this pattern.
    Pattern(&'a Regex),
}

impl KeyFilter<'_> {
    pub fn matches(&self, url: &str) -> bool {
        match self {
            KeyFilter::Url(literal) => url == *literal,
            KeyFilter::Pattern(re) => re.is_match(url),
        }
    }
}

impl<'a> From<&'a Regex> for KeyFilter<'a> {
    fn from(re: &'a Regex) -> Self {
        KeyFilter::Pattern(re)
    }
}

/// Diagnostic snapshot of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of live entries.
    pub size: usize,
    /// Display form of every live key, sorted.
    pub keys: Vec<String>,
}

/// Thread-safe store shared by the interception layer and the push bridge.
pub struct CacheStore {
    entries: Cache<CacheKey, CacheEntry>,
    classifier: Arc<Classifier>,
}

impl CacheStore {
    /// Create an empty store bounded to `max_entries`.
    pub fn new(classifier: Arc<Classifier>, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            classifier,
        }
    }

    /// The classifier used to decide expiry.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Look up a payload.
    ///
    /// Push-refreshed entries never expire. Time-boxed entries are returned
    /// while `elapsed <= ttl` and evicted otherwise. Entries whose URL now
    /// classifies as never-cache are evicted.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Value>> {
        let entry = self.entries.get(key)?;
        match self.classifier.classify(key.url()) {
            CachePolicy::PushRefreshed(_) => Some(entry.payload),
            CachePolicy::TimeBoxed(ttl) if entry.written_at.elapsed() <= ttl => {
                Some(entry.payload)
            }
            policy => {
                if self.evict_if_unchanged(key, &entry) {
                    debug!(key = %key, policy = policy.label(), "evicted stale entry");
                    metrics::counter!(telemetry::EVICTIONS_TOTAL, "reason" => "expired")
                        .increment(1);
                }
                None
            }
        }
    }

    /// Remove `key` only if it still holds `seen`; a concurrent write wins.
    fn evict_if_unchanged(&self, key: &CacheKey, seen: &CacheEntry) -> bool {
        let result = self
            .entries
            .entry(key.clone())
            .and_compute_with(|current| match current {
                Some(current)
                    if current.value().written_at == seen.written_at
                        && Arc::ptr_eq(&current.value().payload, &seen.payload) =>
                {
                    Op::Remove
                }
                _ => Op::Nop,
            });
        matches!(result, CompResult::Removed(_))
    }

    /// Insert or overwrite an entry with a fresh timestamp.
    pub fn set(&self, key: CacheKey, payload: Value) {
        self.entries
            .insert(key, CacheEntry::fresh(Arc::new(payload)));
    }

    /// Overwrite every entry selected by `filter` with `payload`.
    ///
    /// Returns the number of entries updated. Does not create entries.
    pub fn update(&self, filter: KeyFilter<'_>, payload: Value) -> usize {
        let payload = Arc::new(payload);
        let keys = self.matching_keys(filter);
        for key in &keys {
            self.entries
                .insert(key.clone(), CacheEntry::fresh(payload.clone()));
        }
        keys.len()
    }

    /// Replace every entry selected by `filter` with `merge_fn(existing)`.
    ///
    /// Returns the number of entries merged.
    pub fn merge<F>(&self, filter: KeyFilter<'_>, merge_fn: F) -> usize
    where
        F: Fn(&Value) -> Value,
    {
        let matched: Vec<(CacheKey, Arc<Value>)> = self
            .entries
            .iter()
            .filter(|(key, _)| filter.matches(key.url()))
            .map(|(key, entry)| ((*key).clone(), entry.payload))
            .collect();
        for (key, previous) in &matched {
            let next = merge_fn(previous);
            self.entries
                .insert(key.clone(), CacheEntry::fresh(Arc::new(next)));
        }
        matched.len()
    }

    /// Remove every entry whose URL equals `url`.
    pub fn invalidate(&self, url: &str) -> usize {
        self.remove_matching(KeyFilter::Url(url))
    }

    /// Remove every entry whose URL matches `pattern`.
    pub fn invalidate_by_pattern(&self, pattern: &Regex) -> usize {
        self.remove_matching(KeyFilter::Pattern(pattern))
    }

    /// Remove everything.
    pub fn clear(&self) {
        // Per-key removal: entries written right after `clear` must survive.
        for (key, _) in self.entries.iter() {
            self.entries.invalidate(&*key);
        }
    }

    /// Number of live entries (includes expired entries not yet read).
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size and sorted key list, for diagnostics.
    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.entries.iter().map(|(k, _)| k.to_string()).collect();
        keys.sort();
        CacheStats {
            size: keys.len(),
            keys,
        }
    }

    fn matching_keys(&self, filter: KeyFilter<'_>) -> Vec<CacheKey> {
        self.entries
            .iter()
            .filter(|(key, _)| filter.matches(key.url()))
            .map(|(key, _)| (*key).clone())
            .collect()
    }

    fn remove_matching(&self, filter: KeyFilter<'_>) -> usize {
        let keys = self.matching_keys(filter);
        for key in &keys {
            self.entries.invalidate(key);
        }
        if !keys.is_empty() {
            metrics::counter!(telemetry::EVICTIONS_TOTAL, "reason" => "invalidated")
                .increment(keys.len() as u64);
        }
        keys.len()
    }
}
