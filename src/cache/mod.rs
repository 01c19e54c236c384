//! Caching subsystem.
//!
//! Three layers, leaves first:
//!
//! - [`key`]: derives a [`CacheKey`] from a request URL and body, with
//!   canonical ordering of JSON object fields.
//!
//! - [`policy`]: the [`Classifier`] maps each URL to a [`CachePolicy`]:
//!   never cached, push-refreshed (no expiry, kept fresh by the
//!   [`PushBridge`](crate::push::PushBridge)), or time-boxed.
//!
//! - [`store`]: the [`CacheStore`] holding payloads, with lazy TTL expiry
//!   and pattern-based update/merge/invalidate.

pub mod key;
pub mod policy;
pub mod store;

pub use key::{CacheKey, KEY_SEPARATOR, derive_key};
pub use policy::{CachePolicy, Classifier};
pub use store::{CacheEntry, CacheStats, CacheStore, KeyFilter};
