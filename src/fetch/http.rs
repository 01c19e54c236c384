//! Real network fetcher over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::{ApiRequest, ApiResponse, Fetch, RequestBody};
use crate::config::UpstreamConfig;
use crate::{CacheError, Result};

/// [`Fetch`] implementation that performs HTTP requests with a shared
/// `reqwest::Client`.
///
/// Relative request URLs (e.g. `/api/news`) are joined onto the base URL
/// when one is configured.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ReqwestFetcher {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Build a client with the given request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(client))
    }

    /// Build from the `[upstream]` config section.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let fetcher = Self::with_timeout(Duration::from_secs(config.timeout_secs))?;
        match &config.base_url {
            Some(base) => fetcher.base_url(base),
            None => Ok(fetcher),
        }
    }

    /// Set the base URL for relative request URLs.
    pub fn base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base)
            .map_err(|e| CacheError::Configuration(format!("invalid base url '{base}': {e}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        let base = self.base_url.as_ref().ok_or_else(|| {
            CacheError::InvalidInput(format!("relative url '{url}' without base url"))
        })?;
        base.join(url)
            .map_err(|e| CacheError::InvalidInput(format!("invalid url '{url}': {e}")))
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn fetch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, %url, "origin request");

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        builder = match request.body {
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::Binary(bytes)) => builder.body(bytes),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse::new(status, headers, body))
    }
}
