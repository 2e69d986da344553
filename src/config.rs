//! Environment-backed configuration for credentials and service addresses.
//!
//! Provider API keys, the shared Redis address, and the content-store
//! endpoint are supplied out-of-band via environment variables. The two
//! addresses are required: a cycle cannot run without the dedup store or the
//! sink, so their absence fails at startup. Provider keys are optional here —
//! a missing key makes only that provider fail fast per attempt, leaving the
//! keyless fallback fetcher usable.

use thiserror::Error;

/// Errors raised while assembling the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the proxy extraction provider (query-parameter credential).
    pub proxy_fetch_api_key: Option<String>,
    /// API key for the render extraction provider (header credential).
    pub render_api_key: Option<String>,
    /// Address of the shared Redis instance backing the seen-hash set.
    pub redis_url: String,
    /// Full endpoint URL of the content-store write API.
    pub content_store_url: String,
    /// Redis set key holding delivered content hashes.
    pub seen_set_key: String,
    /// Base URL of the proxy provider; overridable for tests.
    pub proxy_fetch_base: String,
    /// Base URL of the render provider; overridable for tests.
    pub render_api_base: String,
}

impl Config {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when `REDIS_URL` or
    /// `CONTENT_STORE_URL` is absent or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            proxy_fetch_api_key: env_var("PROXY_FETCH_API_KEY"),
            render_api_key: env_var("RENDER_API_KEY"),
            redis_url: env_var("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?,
            content_store_url: env_var("CONTENT_STORE_URL")
                .ok_or(ConfigError::MissingVar("CONTENT_STORE_URL"))?,
            seen_set_key: env_var("SEEN_SET_KEY").unwrap_or_else(|| "seen_hashes".to_string()),
            proxy_fetch_base: env_var("PROXY_FETCH_URL")
                .unwrap_or_else(|| "http://api.scrapeproxy.com".to_string()),
            render_api_base: env_var("RENDER_API_URL")
                .unwrap_or_else(|| "https://api.renderapi.com".to_string()),
        })
    }
}

/// Read an environment variable, treating empty values as absent.
fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
