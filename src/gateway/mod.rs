//! Cache facade.
//!
//! [`MarketCache`] owns the one store of a running dashboard and hands out
//! the pieces that share it: cached fetchers for widgets and the push bridge
//! for the real-time transport. It is constructed once at startup and
//! passed to whoever needs it; there is no global.

mod builder;

pub use builder::MarketCacheBuilder;

use std::sync::Arc;

use crate::Result;
use crate::cache::{CacheStats, CacheStore, Classifier};
use crate::config::{CacheConfig, UpstreamConfig};
use crate::fetch::{CachedFetcher, Fetch, ReqwestFetcher};
use crate::push::PushBridge;

/// The response cache of one dashboard process.
pub struct MarketCache {
    config: CacheConfig,
    store: Arc<CacheStore>,
    push: PushBridge,
}

impl MarketCache {
    /// Create a new builder.
    pub fn builder() -> MarketCacheBuilder {
        MarketCacheBuilder::new()
    }

    pub(crate) fn new(config: CacheConfig, store: Arc<CacheStore>, push: PushBridge) -> Self {
        Self {
            config,
            store,
            push,
        }
    }

    /// Wrap a network primitive with this cache.
    pub fn wrap(&self, origin: Arc<dyn Fetch>) -> CachedFetcher {
        CachedFetcher::new(origin, self.store.clone())
            .api_prefix(self.config.api_prefix.clone())
            .dedupe_in_flight(self.config.dedupe_in_flight)
    }

    /// Cached fetcher over a reqwest client built from `upstream`.
    pub fn http(&self, upstream: &UpstreamConfig) -> Result<CachedFetcher> {
        let origin = ReqwestFetcher::from_config(upstream)?;
        Ok(self.wrap(Arc::new(origin)))
    }

    /// The push bridge feeding this cache.
    pub fn push(&self) -> &PushBridge {
        &self.push
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        self.store.classifier()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Size and keys of the store, for diagnostics.
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Drop every entry (logout / session reset).
    pub fn clear(&self) {
        self.store.clear();
    }
}
