//! marketcache - response cache for market-data widgets
//!
//! This crate sits between dashboard widgets and the network. Every
//! outbound data request is classified per endpoint:
//!
//! - **never**: auth, per-user state and mutations always hit the network
//! - **push-refreshed**: streaming widget endpoints are cached without
//!   expiry and kept fresh by push events from the real-time transport
//! - **time-boxed**: everything else is cached for a default TTL
//!   (5 minutes), expired lazily on read
//!
//! Cache hits return a synthesized `200` JSON response, so widgets cannot
//! tell a hit from a network call.
//!
//! # Example
//!
//! ```rust,no_run
//! use marketcache::{MarketCache, UpstreamConfig};
//! use marketcache::fetch::{ApiRequest, Fetch};
//! use marketcache::push::Channel;
//!
//! #[tokio::main]
//! async fn main() -> marketcache::Result<()> {
//!     let cache = MarketCache::builder().build()?;
//!     let upstream = UpstreamConfig {
//!         base_url: Some("https://dashboard.example.com".into()),
//!         ..Default::default()
//!     };
//!     let fetcher = cache.http(&upstream)?;
//!
//!     // First call goes to the network, the second is served from memory.
//!     for _ in 0..2 {
//!         let response = fetcher
//!             .fetch(ApiRequest::get("/api/retail-sentiment/dmx-positioning"))
//!             .await?;
//!         println!("{}", response.text());
//!     }
//!
//!     // The WebSocket handler keeps the entry fresh.
//!     cache
//!         .push()
//!         .update(Channel::DmxPositioning, serde_json::json!({"long": 57.9}));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod push;
pub mod telemetry;

// Re-export main types at crate root
pub use cache::{CacheKey, CachePolicy, CacheStats, CacheStore, Classifier, derive_key};
pub use config::{CacheConfig, Config, UpstreamConfig};
pub use error::{CacheError, Result};
pub use fetch::{ApiRequest, ApiResponse, CachedFetcher, Fetch, ReqwestFetcher};
pub use gateway::{MarketCache, MarketCacheBuilder};
pub use push::{Channel, PushBridge, PushEvent, PushMode};
