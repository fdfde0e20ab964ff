//! Gateway Configuration Module
//!
//! Upstream, cache, and bind settings. Configuration is loaded from
//! environment variables with defaults suitable for local development
//! against the legacy service on port 4001.

use std::net::SocketAddr;
use std::time::Duration;

use tessera_core::ConfigError;
use tessera_storage::DEFAULT_CACHE_CAPACITY;

use crate::retry::RetryPolicy;

pub const DEFAULT_LEGACY_BASE_URL: &str = "http://localhost:4001";
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 2500;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_MS: u64 = 80;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_PORT: u16 = 4000;

// ============================================================================
// GATEWAY CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    // ========================================================================
    // Upstream
    // ========================================================================
    /// Base address of the legacy record service.
    pub legacy_base_url: String,

    /// Deadline for a single upstream attempt.
    pub upstream_timeout: Duration,

    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,

    /// Linear backoff base: retry `n` waits `backoff_base * n`.
    pub backoff_base: Duration,

    // ========================================================================
    // Response cache
    // ========================================================================
    /// When false the gateway runs with a cache that always misses.
    pub cache_enabled: bool,

    pub cache_capacity: usize,

    /// TTL applied to root single-entity results.
    pub cache_ttl: Duration,

    // ========================================================================
    // Server
    // ========================================================================
    pub bind_host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            legacy_base_url: DEFAULT_LEGACY_BASE_URL.to_string(),
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_MS),
            cache_enabled: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl GatewayConfig {
    /// Create GatewayConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TESSERA_LEGACY_BASE_URL` (or `LEGACY_BASE_URL`): legacy service address
    /// - `TESSERA_UPSTREAM_TIMEOUT_MS`: per-attempt deadline (default: 2500)
    /// - `TESSERA_UPSTREAM_MAX_RETRIES`: retries after the first attempt (default: 2)
    /// - `TESSERA_UPSTREAM_BACKOFF_MS`: linear backoff base (default: 80)
    /// - `TESSERA_CACHE_ENABLED`: "false" disables the response cache (default: true)
    /// - `TESSERA_CACHE_CAPACITY`: max cached entries (default: 5000)
    /// - `TESSERA_CACHE_TTL_SECS`: TTL of cached root lookups (default: 30)
    /// - `TESSERA_API_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` (or `TESSERA_API_PORT`): bind port (default: 4000)
    ///
    /// Unparseable numbers fall back to their default; call [`validate`]
    /// to reject values that parse but make no sense.
    ///
    /// [`validate`]: GatewayConfig::validate
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let legacy_base_url = lookup("TESSERA_LEGACY_BASE_URL")
            .or_else(|| lookup("LEGACY_BASE_URL"))
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.legacy_base_url);

        let upstream_timeout = parsed("TESSERA_UPSTREAM_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.upstream_timeout);

        let max_retries = lookup("TESSERA_UPSTREAM_MAX_RETRIES")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_retries);

        let backoff_base = parsed("TESSERA_UPSTREAM_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff_base);

        let cache_enabled = lookup("TESSERA_CACHE_ENABLED")
            .map(|s| !matches!(s.trim().to_lowercase().as_str(), "false" | "0" | "off"))
            .unwrap_or(defaults.cache_enabled);

        let cache_capacity = lookup("TESSERA_CACHE_CAPACITY")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.cache_capacity);

        let cache_ttl = parsed("TESSERA_CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let bind_host = lookup("TESSERA_API_BIND").unwrap_or(defaults.bind_host);

        let port = lookup("PORT")
            .or_else(|| lookup("TESSERA_API_PORT"))
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        Self {
            legacy_base_url,
            upstream_timeout,
            max_retries,
            backoff_base,
            cache_enabled,
            cache_capacity,
            cache_ttl,
            bind_host,
            port,
        }
    }

    /// Reject configurations the gateway cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.legacy_base_url.starts_with("http://")
            || self.legacy_base_url.starts_with("https://"))
        {
            return Err(invalid(
                "legacy_base_url",
                &self.legacy_base_url,
                "must be an http:// or https:// URL",
            ));
        }
        if self.upstream_timeout.is_zero() {
            return Err(invalid("upstream_timeout", "0ms", "must be greater than zero"));
        }
        if self.cache_enabled && self.cache_capacity == 0 {
            return Err(invalid(
                "cache_capacity",
                "0",
                "must be greater than zero when the cache is enabled",
            ));
        }
        if self.cache_ttl > Duration::from_secs(MAX_CACHE_TTL_SECS) {
            return Err(invalid(
                "cache_ttl",
                &format!("{}s", self.cache_ttl.as_secs()),
                "must be at most one day",
            ));
        }
        self.bind_addr().map(|_| ())
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| invalid("bind_addr", &addr, &e.to_string()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            attempt_timeout: self.upstream_timeout,
        }
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
