//! Endpoint classification.
//!
//! The [`Classifier`] assigns every outbound request exactly one
//! [`CachePolicy`] by ordered pattern matching:
//!
//! 1. never-cache patterns (auth, per-user state, destructive verbs)
//! 2. push-refreshed patterns, one per [`Channel`]
//! 3. anything else is time-boxed with the configured default TTL
//!
//! A URL matching both a never-cache and a push-refreshed pattern is
//! `Never`. Only `GET` and `POST` requests are cacheable at all; every other
//! method classifies as `Never` regardless of URL.

use std::time::Duration;

use regex::Regex;
use reqwest::Method;

use crate::Result;
use crate::config::CacheConfig;
use crate::push::Channel;

/// Caching policy for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never stored; always goes to the network.
    Never,
    /// Stored without expiry; kept fresh by push events on the channel.
    PushRefreshed(Channel),
    /// Stored until the TTL elapses (checked lazily on read).
    TimeBoxed(Duration),
}

impl CachePolicy {
    pub fn is_never(&self) -> bool {
        matches!(self, CachePolicy::Never)
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            CachePolicy::Never => "never",
            CachePolicy::PushRefreshed(_) => "push",
            CachePolicy::TimeBoxed(_) => "ttl",
        }
    }
}

/// Ordered URL rules mapping requests to cache policies.
#[derive(Debug, Clone)]
pub struct Classifier {
    never_cache: Vec<Regex>,
    push_refreshed: Vec<(Channel, Regex)>,
    default_ttl: Duration,
}

impl Classifier {
    /// Compile the rules in `config`.
    ///
    /// Returns a `Configuration` error if any pattern fails to compile.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let never_cache = config
            .never_cache
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<_, _>>()?;
        let push_refreshed = Channel::ALL
            .into_iter()
            .map(|channel| Ok((channel, Regex::new(config.pattern_for(channel))?)))
            .collect::<Result<_>>()?;
        Ok(Self {
            never_cache,
            push_refreshed,
            default_ttl: config.default_ttl,
        })
    }

    /// Classify a URL, ignoring the HTTP method.
    pub fn classify(&self, url: &str) -> CachePolicy {
        if self.never_cache.iter().any(|r| r.is_match(url)) {
            return CachePolicy::Never;
        }
        if let Some((channel, _)) = self.push_refreshed.iter().find(|(_, r)| r.is_match(url)) {
            return CachePolicy::PushRefreshed(*channel);
        }
        CachePolicy::TimeBoxed(self.default_ttl)
    }

    /// Classify a request. Methods other than GET and POST are never cached.
    pub fn classify_request(&self, method: &Method, url: &str) -> CachePolicy {
        if *method != Method::GET && *method != Method::POST {
            return CachePolicy::Never;
        }
        self.classify(url)
    }

    /// Compiled pattern for a push channel.
    ///
    /// `None` only if the classifier was built without that channel, which
    /// [`Classifier::new`] never does.
    pub fn channel_pattern(&self, channel: Channel) -> Option<&Regex> {
        self.push_refreshed
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, re)| re)
    }

    /// TTL applied to time-boxed entries.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Never-cache patterns, in evaluation order.
    pub fn never_cache_patterns(&self) -> impl Iterator<Item = &str> {
        self.never_cache.iter().map(Regex::as_str)
    }

    /// Push-refreshed patterns with their channels, in evaluation order.
    pub fn push_patterns(&self) -> impl Iterator<Item = (Channel, &str)> {
        self.push_refreshed.iter().map(|(c, r)| (*c, r.as_str()))
    }
}

impl Default for Classifier {
    /// Classifier with the built-in rules.
    fn default() -> Self {
        Self::new(&CacheConfig::default()).expect("built-in cache patterns are valid")
    }
}
