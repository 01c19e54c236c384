//! mcache: marketcache diagnostics CLI
//!
//! Inspect classification and key derivation, and exercise the cache
//! against a live dashboard API.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marketcache::fetch::{ApiRequest, Fetch};
use marketcache::{CacheKey, CachePolicy, Config, MarketCache};
use reqwest::Method;

/// marketcache CLI
#[derive(Parser)]
#[command(name = "mcache")]
#[command(version)]
#[command(about = "Market-data response cache diagnostics")]
struct Args {
    /// Path to configuration file (default: built-in rules).
    #[arg(short, long, env = "MARKETCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the cache policy for a URL
    Classify {
        /// Request URL or path
        url: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
    },

    /// Show the cache key derived for a request
    Key {
        /// Request URL or path
        url: String,
        /// Request body (or "-" to read from stdin)
        #[arg(short, long)]
        body: Option<String>,
    },

    /// List the effective classification rules
    Rules,

    /// Issue a request through the cache, optionally several times
    Fetch {
        /// Request URL or path
        url: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Request body (or "-" to read from stdin)
        #[arg(short, long)]
        body: Option<String>,
        /// Base URL for relative paths (overrides config)
        #[arg(long)]
        base_url: Option<String>,
        /// Number of times to issue the request
        #[arg(short, long, default_value_t = 2)]
        repeat: u32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => Config::load(Some(path))?,
        None => Config::default(),
    };
    let cache = MarketCache::builder().config(config.cache.clone()).build()?;

    match args.command {
        Command::Classify { url, method } => {
            let method = parse_method(&method)?;
            let policy = cache.classifier().classify_request(&method, &url);
            println!("{}", describe(policy));
        }

        Command::Key { url, body } => {
            let body = resolve_body(body)?;
            let key = CacheKey::derive(&url, body.as_deref());
            println!("{key}");
        }

        Command::Rules => {
            let classifier = cache.classifier();
            println!("never:");
            for pattern in classifier.never_cache_patterns() {
                println!("  {pattern}");
            }
            println!("push:");
            for (channel, pattern) in classifier.push_patterns() {
                println!("  {channel:<18} {pattern}");
            }
            println!(
                "default: time-boxed ({}s)",
                classifier.default_ttl().as_secs()
            );
        }

        Command::Fetch {
            url,
            method,
            body,
            base_url,
            repeat,
        } => {
            let mut upstream = config.upstream.clone();
            if base_url.is_some() {
                upstream.base_url = base_url;
            }
            let fetcher = cache.http(&upstream)?;

            let method = parse_method(&method)?;
            let body = resolve_body(body)?;
            println!(
                "policy: {}",
                describe(cache.classifier().classify_request(&method, &url))
            );

            for attempt in 1..=repeat {
                let mut request = ApiRequest::new(method.clone(), url.clone());
                if let Some(ref text) = body {
                    request = request.text(text.clone());
                }
                let before = cache.stats().size;
                let started = std::time::Instant::now();
                let response = fetcher.fetch(request).await?;
                println!(
                    "#{attempt}: {} ({} bytes, {:.1}ms, store {} -> {})",
                    response.status(),
                    response.body().len(),
                    started.elapsed().as_secs_f64() * 1000.0,
                    before,
                    cache.stats().size
                );
            }

            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
    }

    Ok(())
}

fn parse_method(method: &str) -> Result<Method, Box<dyn std::error::Error>> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid method '{method}': {e}").into())
}

fn describe(policy: CachePolicy) -> String {
    match policy {
        CachePolicy::Never => "never".to_string(),
        CachePolicy::PushRefreshed(channel) => format!("push-refreshed ({channel})"),
        CachePolicy::TimeBoxed(ttl) => format!("time-boxed ({}s)", ttl.as_secs()),
    }
}

/// Resolve a body argument; `-` reads stdin (when piped).
fn resolve_body(body: Option<String>) -> Result<Option<String>, Box<dyn std::error::Error>> {
    match body.as_deref() {
        Some("-") => {
            if io::stdin().is_terminal() {
                return Err("body '-' requires piped stdin".into());
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(Some(buf.trim_end().to_string()))
        }
        _ => Ok(body),
    }
}
