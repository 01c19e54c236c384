//! Builder for configuring cache instances

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::MarketCache;
use crate::Result;
use crate::cache::{CacheStore, Classifier};
use crate::config::CacheConfig;
use crate::push::{Channel, PushBridge};

/// Builder for configuring [`MarketCache`] instances.
#[derive(Debug, Clone, Default)]
pub struct MarketCacheBuilder {
    config: CacheConfig,
}

impl MarketCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full config (e.g. the `[cache]` section of a file).
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the TTL for time-boxed entries (default: 5 minutes).
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.default_ttl(ttl);
        self
    }

    /// Set the maximum number of live entries (default: 10,000).
    pub fn max_entries(mut self, n: u64) -> Self {
        self.config = self.config.max_entries(n);
        self
    }

    /// Set the path prefix of cacheable API routes (default: `/api/`).
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config = self.config.api_prefix(prefix);
        self
    }

    /// Append a never-cache pattern.
    pub fn never_cache(mut self, pattern: impl Into<String>) -> Self {
        self.config = self.config.never_cache(pattern);
        self
    }

    /// Override a push channel's URL pattern.
    pub fn channel_pattern(mut self, channel: Channel, pattern: impl Into<String>) -> Self {
        self.config = self.config.channel_pattern(channel, pattern);
        self
    }

    /// Collapse concurrent cold requests for the same key (default: off).
    pub fn dedupe_in_flight(mut self, enabled: bool) -> Self {
        self.config = self.config.dedupe_in_flight(enabled);
        self
    }

    /// Build the cache.
    ///
    /// Fails with a `Configuration` error if any pattern does not compile.
    pub fn build(self) -> Result<MarketCache> {
        let classifier = Arc::new(Classifier::new(&self.config)?);
        let store = Arc::new(CacheStore::new(classifier, self.config.max_entries));
        let push = PushBridge::new(store.clone());

        info!(
            default_ttl_secs = self.config.default_ttl.as_secs(),
            max_entries = self.config.max_entries,
            never_cache = self.config.never_cache.len(),
            channels = Channel::ALL.len(),
            dedupe_in_flight = self.config.dedupe_in_flight,
            "market cache ready"
        );

        Ok(MarketCache::new(self.config, store, push))
    }
}
