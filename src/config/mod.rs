//! Configuration module for the timetable cache.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_UPSTREAM_URL: &str = "https://iis.bsuir.by/api/v1";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy favorites index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Base URL of the upstream schedule API
    pub upstream_url: String,
    /// Fixed timeout applied to every upstream request
    pub upstream_timeout: Duration,
    /// Upper bound on every store call
    pub store_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("TT_DB_PATH")
            .unwrap_or_else(|_| "./data/cache.sqlite".to_string())
            .into();

        let index_path = env::var("TT_INDEX_PATH")
            .unwrap_or_else(|_| "./data/favorites-index".to_string())
            .into();

        let bind_addr = parse_or("TT_BIND_ADDR", || {
            DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080)))
        });

        let log_level = env::var("TT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upstream_url = env::var("TT_UPSTREAM_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());

        let upstream_timeout = Duration::from_secs(parse_or("TT_UPSTREAM_TIMEOUT_SECS", || {
            DEFAULT_UPSTREAM_TIMEOUT_SECS
        }));
        let store_timeout = Duration::from_secs(parse_or("TT_STORE_TIMEOUT_SECS", || {
            DEFAULT_STORE_TIMEOUT_SECS
        }));

        Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            upstream_url,
            upstream_timeout,
            store_timeout,
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr>(key: &str, default: impl FnOnce() -> T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
                default()
            }
        },
        Err(_) => default(),
    }
}
