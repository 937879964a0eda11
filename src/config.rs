//! Process configuration for the proxy.
//!
//! Every recognized environment variable is loaded once at startup into a
//! [`ProxyConfig`], validated eagerly so misconfiguration fails fast rather
//! than surfacing as a confusing runtime error on the first request.

use std::env;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Fully validated process configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the legacy upstream SCIM service.
    pub upstream_base_url: String,
    /// Per-request timeout when calling upstream.
    pub upstream_timeout: Duration,
    /// Address the proxy's HTTP server binds to.
    pub proxy_host: String,
    /// Port the proxy's HTTP server binds to.
    pub proxy_port: u16,
    /// Tokio worker thread hint.
    pub proxy_workers: usize,
    /// Response cache entry lifetime. Zero disables caching.
    pub cache_ttl: Duration,
    /// Response cache capacity, in entries.
    pub cache_max_size: u64,
    /// Maximum filter AST complexity before the parser rejects the filter.
    pub max_filter_complexity: usize,
    /// Upper bound on upstream records fetched while satisfying a filtered
    /// list request.
    pub max_filter_fetch_size: usize,
    /// Multiplier applied to the requested page size when deciding how many
    /// upstream records to fetch for a filtered list request.
    pub filter_fetch_multiplier: usize,
    /// Whether the upstream implements native PATCH. No discovery probe
    /// exists yet, so this is a static hint; `false` means every PATCH
    /// goes through read-modify-write.
    pub upstream_supports_patch: bool,
}

impl ProxyConfig {
    /// Load configuration from the process environment.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use scim_upgrade_proxy::config::ProxyConfig;
    ///
    /// let config = ProxyConfig::from_env().expect("missing UPSTREAM_BASE_URL");
    /// ```
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            upstream_base_url: required("UPSTREAM_BASE_URL")?,
            upstream_timeout: Duration::from_secs(parse_env("UPSTREAM_TIMEOUT", 10)?),
            proxy_host: env::var("PROXY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            proxy_port: parse_env("PROXY_PORT", 8080)?,
            proxy_workers: parse_env("PROXY_WORKERS", num_cpus())?,
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL", 30)?),
            cache_max_size: parse_env("CACHE_MAX_SIZE", 10_000)?,
            max_filter_complexity: parse_env("MAX_FILTER_COMPLEXITY", 50)?,
            max_filter_fetch_size: parse_env("MAX_FILTER_FETCH_SIZE", 2000)?,
            filter_fetch_multiplier: parse_env("FILTER_FETCH_MULTIPLIER", 20)?,
            upstream_supports_patch: parse_env("UPSTREAM_SUPPORTS_PATCH", false)?,
        })
    }
}

fn required(name: &'static str) -> ConfigResult<String> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_env<T>(name: &'static str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
