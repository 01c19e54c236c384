//! Tests for configuration loading.

use std::time::Duration;

use marketcache::push::Channel;
use marketcache::{CacheError, CachePolicy, Config, MarketCache};

const FULL: &str = r#"
[cache]
default_ttl_secs = 60
max_entries = 500
api_prefix = "/data/"
dedupe_in_flight = true
never_cache = ["/data/auth/", "/data/admin"]

[cache.channels]
dmx-positioning = "/data/v2/dmx"
news-feed = "/data/headlines"

[upstream]
base_url = "https://dashboard.example.com"
timeout_secs = 5
"#;

#[test]
fn parses_every_section() {
    let config = Config::from_toml(FULL).unwrap();

    assert_eq!(config.cache.default_ttl, Duration::from_secs(60));
    assert_eq!(config.cache.max_entries, 500);
    assert_eq!(config.cache.api_prefix, "/data/");
    assert!(config.cache.dedupe_in_flight);
    assert_eq!(config.cache.never_cache, vec!["/data/auth/", "/data/admin"]);
    assert_eq!(config.cache.pattern_for(Channel::DmxPositioning), "/data/v2/dmx");
    assert_eq!(config.cache.pattern_for(Channel::NewsFeed), "/data/headlines");
    assert_eq!(
        config.cache.pattern_for(Channel::OrderFlow),
        Channel::OrderFlow.default_pattern()
    );

    assert_eq!(
        config.upstream.base_url.as_deref(),
        Some("https://dashboard.example.com")
    );
    assert_eq!(config.upstream.timeout_secs, 5);
}

#[test]
fn partial_cache_section_keeps_defaults() {
    let config = Config::from_toml("[cache]\ndefault_ttl_secs = 120\n").unwrap();
    assert_eq!(config.cache.default_ttl, Duration::from_secs(120));
    assert_eq!(config.cache.max_entries, 10_000);
    assert_eq!(config.cache.api_prefix, "/api/");
    assert!(!config.cache.never_cache.is_empty());
}

#[test]
fn unknown_channel_is_rejected() {
    let toml = "[cache.channels]\nwhale-alerts = \"/api/whales\"\n";
    let err = Config::from_toml(toml).unwrap_err();
    assert!(matches!(err, CacheError::Configuration(_)));
}

#[test]
fn loaded_rules_drive_classification() {
    let config = Config::from_toml(FULL).unwrap();
    let cache = MarketCache::builder().config(config.cache).build().unwrap();

    assert_eq!(cache.classifier().classify("/data/admin/users"), CachePolicy::Never);
    assert_eq!(
        cache.classifier().classify("/data/v2/dmx"),
        CachePolicy::PushRefreshed(Channel::DmxPositioning)
    );
    assert_eq!(
        cache.classifier().classify("/data/instruments"),
        CachePolicy::TimeBoxed(Duration::from_secs(60))
    );
}

#[test]
fn invalid_pattern_fails_build() {
    let config = Config::from_toml("[cache]\nnever_cache = [\"/api/(unclosed\"]\n").unwrap();
    let err = MarketCache::builder().config(config.cache).build().err().unwrap();
    match err {
        CacheError::Configuration(msg) => assert!(msg.contains("invalid url pattern")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// =============================================================================
// File loading (uses tempdir)
// =============================================================================

#[test]
fn load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, FULL).unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.cache.max_entries, 500);
}

#[test]
fn load_missing_explicit_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn load_unparsable_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[cache\nmax_entries = ").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Failed to parse config file"));
    assert!(msg.contains("broken.toml"));
}
