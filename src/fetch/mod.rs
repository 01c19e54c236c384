//! Request interception.
//!
//! [`Fetch`] stands for the network request primitive. Widgets depend on
//! `Arc<dyn Fetch>` and never know whether caching is in place:
//!
//! - [`ReqwestFetcher`] performs real HTTP calls.
//! - [`CachedFetcher`] decorates any `Fetch` with the classifier + store
//!   logic. It captures its origin once, at construction, and always calls
//!   that origin for the real request; stacking two `CachedFetcher`s still
//!   reaches the network at most once per request.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use marketcache::MarketCache;
//! use marketcache::fetch::{ApiRequest, Fetch, ReqwestFetcher};
//!
//! # async fn run() -> marketcache::Result<()> {
//! let cache = MarketCache::builder().build()?;
//! let origin = ReqwestFetcher::new(reqwest::Client::new())
//!     .base_url("https://dashboard.example.com")?;
//! let fetcher = cache.wrap(Arc::new(origin));
//!
//! let request = ApiRequest::post("/api/retail-sentiment/dmx-positioning")
//!     .json(&serde_json::json!({"symbol": "EURUSD", "module": "Forex"}))?;
//! let response = fetcher.fetch(request).await?;
//! let body: serde_json::Value = response.json()?;
//! # Ok(())
//! # }
//! ```

mod cached;
mod http;

pub use cached::CachedFetcher;
pub use http::ReqwestFetcher;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Result;
use crate::cache::CacheKey;

/// The network request primitive.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetcher name for logging/debugging.
    fn name(&self) -> &str;

    /// Perform a request.
    ///
    /// Transport failures are errors; non-2xx statuses are returned as
    /// ordinary responses.
    async fn fetch(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// String body; participates in key derivation.
    Text(String),
    /// Opaque bytes; requests carrying these bypass the cache.
    Binary(Vec<u8>),
}

/// An outbound request, as issued by a widget.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a string body.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Set a JSON body (as text) and the JSON content type.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_string(body)?;
        Ok(self
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .text(encoded))
    }

    /// Set a binary body. Such requests are never cached.
    pub fn binary(mut self, body: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Binary(body));
        self
    }

    /// Cache key for this request, or `None` if the body cannot be keyed.
    pub fn cache_key(&self) -> Option<CacheKey> {
        match &self.body {
            None => Some(CacheKey::derive(&self.url, None)),
            Some(RequestBody::Text(text)) => Some(CacheKey::derive(&self.url, Some(text))),
            Some(RequestBody::Binary(_)) => None,
        }
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// `200 OK` JSON response carrying `payload`, as served on a cache hit.
    pub(crate) fn from_payload(payload: &Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(StatusCode::OK, headers, payload.to_string().into_bytes())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text (lossy UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
