//! Telemetry metric name constants.
//!
//! Centralised metric names for cache operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `marketcache_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `outcome`: interception decision: "hit", "miss" or "bypass"
//! - `source`: who wrote a store entry: "fetch" or "push"
//! - `channel`: push channel wire name (e.g. "dmx-positioning")

/// Total requests seen by the interception layer.
///
/// Labels: `outcome` ("hit" | "miss" | "bypass").
pub const REQUESTS_TOTAL: &str = "marketcache_requests_total";

/// Total store writes.
///
/// Labels: `source` ("fetch" | "push").
pub const STORE_WRITES_TOTAL: &str = "marketcache_store_writes_total";

/// Total entries removed from the store.
///
/// Labels: `reason` ("expired" | "invalidated").
pub const EVICTIONS_TOTAL: &str = "marketcache_evictions_total";

/// Total push events applied through the bridge.
///
/// Labels: `channel`, `mode` ("replace" | "merge" | "invalidate").
pub const PUSH_EVENTS_TOTAL: &str = "marketcache_push_events_total";

/// Total push events rejected by the bridge.
///
/// Labels: `reason` ("unknown_channel" | "channel_mismatch" | "malformed").
pub const PUSH_ERRORS_TOTAL: &str = "marketcache_push_errors_total";
