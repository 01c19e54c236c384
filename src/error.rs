//! marketcache error types

use crate::push::Channel;

/// marketcache error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    // Network errors (origin fetch)
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Push bridge errors
    /// A push event named a channel that has no entry in the channel table.
    #[error("unknown push channel: {0}")]
    UnknownChannel(String),

    /// A primed key is not classified as push-refreshed for the given channel.
    #[error("url '{url}' is not served by push channel '{channel}'")]
    ChannelMismatch { channel: Channel, url: String },
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CacheError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => CacheError::Http(err.to_string()),
        }
    }
}

impl From<regex::Error> for CacheError {
    fn from(err: regex::Error) -> Self {
        CacheError::Configuration(format!("invalid url pattern: {err}"))
    }
}

/// Result type alias for marketcache operations
pub type Result<T> = std::result::Result<T, CacheError>;
