//! Push-update bridge between the real-time transport and the store.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Channel;
use crate::cache::{CacheKey, CachePolicy, CacheStore, KeyFilter};
use crate::telemetry;
use crate::{CacheError, Result};

/// How a push event is applied to matching entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushMode {
    /// Overwrite the payload.
    #[default]
    Replace,
    /// Shallow-merge the event data into the existing payload.
    Merge,
    /// Drop the entries.
    Invalidate,
}

impl PushMode {
    fn label(self) -> &'static str {
        match self {
            PushMode::Replace => "replace",
            PushMode::Merge => "merge",
            PushMode::Invalidate => "invalidate",
        }
    }
}

/// A push event as it arrives on the wire.
///
/// ```json
/// { "channel": "dmx-positioning", "mode": "merge", "data": { "long": 58.2 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// Channel wire name; resolved with [`Channel::from_str`](std::str::FromStr).
    pub channel: String,
    #[serde(default)]
    pub mode: PushMode,
    #[serde(default)]
    pub data: Value,
}

/// Routes push events into the store by channel pattern.
///
/// The channel → pattern table is the classifier's push-refreshed tier, so
/// the bridge only ever touches entries the classifier treats as
/// push-refreshed for that channel.
#[derive(Clone)]
pub struct PushBridge {
    store: Arc<CacheStore>,
}

impl PushBridge {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Replace the payload of every cached entry on `channel`.
    ///
    /// Returns the number of entries updated.
    pub fn update(&self, channel: Channel, payload: Value) -> usize {
        let updated = self
            .pattern(channel)
            .map_or(0, |re| self.store.update(KeyFilter::Pattern(re), payload));
        self.record(channel, PushMode::Replace, updated);
        updated
    }

    /// Replace the payload of every cached entry on `channel` with
    /// `merge_fn(previous)`.
    pub fn merge<F>(&self, channel: Channel, merge_fn: F) -> usize
    where
        F: Fn(&Value) -> Value,
    {
        let merged = self
            .pattern(channel)
            .map_or(0, |re| self.store.merge(KeyFilter::Pattern(re), merge_fn));
        self.record(channel, PushMode::Merge, merged);
        merged
    }

    /// Drop every cached entry on `channel`.
    pub fn invalidate(&self, channel: Channel) -> usize {
        let removed = self
            .pattern(channel)
            .map_or(0, |re| self.store.invalidate_by_pattern(re));
        self.record(channel, PushMode::Invalidate, removed);
        removed
    }

    /// Drop every push-refreshed entry on every channel.
    ///
    /// Time-boxed entries are left alone; their TTL already bounds staleness.
    pub fn invalidate_all(&self) -> usize {
        Channel::ALL.into_iter().map(|c| self.invalidate(c)).sum()
    }

    /// Pre-populate an entry for `key` before any fetch has happened.
    ///
    /// Rejects keys the classifier does not assign to `channel`.
    pub fn prime(&self, channel: Channel, key: CacheKey, payload: Value) -> Result<()> {
        match self.store.classifier().classify(key.url()) {
            CachePolicy::PushRefreshed(c) if c == channel => {
                debug!(%channel, key = %key, "priming push entry");
                self.store.set(key, payload);
                metrics::counter!(telemetry::STORE_WRITES_TOTAL, "source" => "push").increment(1);
                Ok(())
            }
            policy => {
                warn!(%channel, key = %key, policy = policy.label(), "rejected push prime");
                metrics::counter!(telemetry::PUSH_ERRORS_TOTAL, "reason" => "channel_mismatch")
                    .increment(1);
                Err(CacheError::ChannelMismatch {
                    channel,
                    url: key.url().to_string(),
                })
            }
        }
    }

    /// Apply a wire event.
    ///
    /// Unknown channels are reported as [`CacheError::UnknownChannel`] and
    /// leave the store untouched.
    pub fn apply(&self, event: PushEvent) -> Result<usize> {
        let channel = event.channel.parse::<Channel>().inspect_err(|e| {
            warn!(channel = %event.channel, error = %e, "dropping push event");
            metrics::counter!(telemetry::PUSH_ERRORS_TOTAL, "reason" => "unknown_channel")
                .increment(1);
        })?;
        let applied = match event.mode {
            PushMode::Replace => self.update(channel, event.data),
            PushMode::Merge => self.merge(channel, |prev| shallow_merge(prev, &event.data)),
            PushMode::Invalidate => self.invalidate(channel),
        };
        Ok(applied)
    }

    /// Decode and apply a raw JSON event.
    pub fn apply_json(&self, raw: &str) -> Result<usize> {
        let event: PushEvent = serde_json::from_str(raw).inspect_err(|e| {
            warn!(error = %e, "malformed push event");
            metrics::counter!(telemetry::PUSH_ERRORS_TOTAL, "reason" => "malformed").increment(1);
        })?;
        self.apply(event)
    }

    fn pattern(&self, channel: Channel) -> Option<&Regex> {
        self.store.classifier().channel_pattern(channel)
    }

    fn record(&self, channel: Channel, mode: PushMode, touched: usize) {
        debug!(%channel, mode = mode.label(), touched, "push applied");
        metrics::counter!(telemetry::PUSH_EVENTS_TOTAL,
            "channel" => channel.name(),
            "mode" => mode.label(),
        )
        .increment(1);
        if mode != PushMode::Invalidate && touched > 0 {
            metrics::counter!(telemetry::STORE_WRITES_TOTAL, "source" => "push")
                .increment(touched as u64);
        }
    }
}

/// Overlay the fields of `delta` onto `base`.
///
/// Object onto object copies each top-level field of `delta` over `base`.
/// Any other combination yields `delta` unchanged.
pub fn shallow_merge(base: &Value, delta: &Value) -> Value {
    match (base, delta) {
        (Value::Object(base), Value::Object(delta)) => {
            let mut merged = base.clone();
            for (k, v) in delta {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => delta.clone(),
    }
}
