//! Cache key derivation.
//!
//! A [`CacheKey`] identifies a request by its URL and, when present, a
//! canonical form of its body. Two requests are the same cache entry iff
//! their keys are equal.
//!
//! Canonical bodies sort JSON object keys (at every depth) so that
//! `{"symbol":"EURUSD","module":"Forex"}` and
//! `{"module":"Forex","symbol":"EURUSD"}` collide. Array order is kept:
//! `[1, 2]` and `[2, 1]` are different requests. Numbers keep their source
//! text (serde_json `arbitrary_precision`), so integers beyond 64 bits and
//! long decimals are never rounded into each other.
//!
//! The key is a structured pair rather than a concatenated string, so a URL
//! that happens to contain [`KEY_SEPARATOR`] cannot alias a URL+body key.
//! The separator only appears in the display form.

use std::fmt;

use serde_json::{Map, Value};

/// Separator used between URL and body in the display form of a key.
pub const KEY_SEPARATOR: &str = "::";

/// Identity of a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    url: String,
    body: Option<String>,
}

impl CacheKey {
    /// Derive a key from a request URL and optional body.
    ///
    /// Never fails: bodies that are not JSON objects are kept verbatim.
    /// An empty body is treated as no body.
    pub fn derive(url: &str, body: Option<&str>) -> Self {
        let body = body.filter(|b| !b.is_empty()).map(canonical_body);
        Self {
            url: url.to_string(),
            body,
        }
    }

    /// The request URL this key was derived from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The canonical body, if the request carried one.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{}{KEY_SEPARATOR}{body}", self.url),
            None => f.write_str(&self.url),
        }
    }
}

/// Shorthand for [`CacheKey::derive`].
pub fn derive_key(url: &str, body: Option<&str>) -> CacheKey {
    CacheKey::derive(url, body)
}

/// Canonical encoding of a request body.
///
/// JSON objects are re-encoded with sorted keys; everything else (arrays,
/// scalars, invalid JSON) falls back to the raw string.
fn canonical_body(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => sorted(value).to_string(),
        _ => raw.to_string(),
    }
}

/// Rebuild a value with object keys inserted in ascending order.
///
/// Rebuilding (rather than relying on the map's iteration order) keeps the
/// encoding sorted whether or not serde_json's `preserve_order` is enabled.
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, sorted(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}
