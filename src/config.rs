//! Cache configuration.
//!
//! [`CacheConfig`] holds every tunable of the cache: the classifier rules,
//! the default TTL and the interception settings. It can be built in code
//! with builder-style setters or read from the `[cache]` section of a TOML
//! file via [`Config::load`]:
//!
//! ```toml
//! [cache]
//! default_ttl_secs = 300
//! max_entries = 10000
//! api_prefix = "/api/"
//! dedupe_in_flight = true
//! never_cache = ["/api/auth/", "/(create|update|delete)(/|\\?|$)"]
//!
//! [cache.channels]
//! dmx-positioning = "/api/v2/retail-sentiment/dmx-positioning"
//!
//! [upstream]
//! base_url = "https://dashboard.example.com"
//! timeout_secs = 30
//! ```
//!
//! Configuration is loaded with the following resolution order:
//! 1. `--config <path>` (explicit path)
//! 2. `~/.marketcache/config.toml` (user)
//! 3. `/etc/marketcache/config.toml` (system)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::push::Channel;
use crate::{CacheError, Result};

/// Default TTL for time-boxed entries: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of live entries.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Default prefix identifying API routes eligible for caching.
pub const DEFAULT_API_PREFIX: &str = "/api/";

/// Built-in never-cache patterns: mutations, auth and per-user state.
pub const DEFAULT_NEVER_CACHE: &[&str] = &[
    r"/api/auth/",
    r"/api/session",
    r"/api/user/",
    r"/api/layouts?(/|\?|$)",
    r"/api/settings",
    r"/(create|update|delete|remove|save|reset|subscribe|unsubscribe|login|logout)(/|\?|$)",
];

/// Configuration for the cache layer.
///
/// ```rust
/// # use marketcache::CacheConfig;
/// # use marketcache::push::Channel;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .default_ttl(Duration::from_secs(60))
///     .never_cache(r"/api/admin/")
///     .channel_pattern(Channel::NewsFeed, r"/api/v2/news");
/// assert_eq!(config.default_ttl, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for time-boxed entries. Default: 5 minutes.
    #[serde(rename = "default_ttl_secs", deserialize_with = "duration_secs")]
    pub default_ttl: Duration,
    /// Maximum number of live entries. Default: 10,000.
    pub max_entries: u64,
    /// Path prefix of routes eligible for caching. Default: `/api/`.
    pub api_prefix: String,
    /// Collapse concurrent cold requests for the same key. Default: false.
    pub dedupe_in_flight: bool,
    /// Never-cache patterns, checked before anything else.
    pub never_cache: Vec<String>,
    /// Per-channel pattern overrides; channels not listed use their default.
    pub channels: BTreeMap<Channel, String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            dedupe_in_flight: false,
            never_cache: DEFAULT_NEVER_CACHE.iter().map(|p| p.to_string()).collect(),
            channels: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with the built-in rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL for time-boxed entries.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the maximum number of live entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the API route prefix.
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Enable or disable in-flight de-duplication.
    pub fn dedupe_in_flight(mut self, enabled: bool) -> Self {
        self.dedupe_in_flight = enabled;
        self
    }

    /// Append a never-cache pattern.
    pub fn never_cache(mut self, pattern: impl Into<String>) -> Self {
        self.never_cache.push(pattern.into());
        self
    }

    /// Replace the never-cache patterns.
    pub fn never_cache_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.never_cache = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Override the URL pattern of a push channel.
    pub fn channel_pattern(mut self, channel: Channel, pattern: impl Into<String>) -> Self {
        self.channels.insert(channel, pattern.into());
        self
    }

    /// Effective pattern for a channel (override or built-in default).
    pub fn pattern_for(&self, channel: Channel) -> &str {
        self.channels
            .get(&channel)
            .map(String::as_str)
            .unwrap_or_else(|| channel.default_pattern())
    }
}

fn duration_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Upstream (origin) HTTP settings used by the reqwest fetcher.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL joined with relative request URLs.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.marketcache/config.toml`
    /// 3. `/etc/marketcache/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            CacheError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| {
            CacheError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CacheError::Configuration(e.to_string()))
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(CacheError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".marketcache").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/marketcache/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(CacheError::Configuration(
            "No config file found. Create ~/.marketcache/config.toml or /etc/marketcache/config.toml"
                .to_string(),
        ))
    }
}
