//! Configuration Module
//!
//! Loads cache backend configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Master switch; when false every operation bypasses the cache
    pub enable_cache: bool,
    /// Enables the in-process backend
    pub enable_memory_cache: bool,
    /// Enables the Redis backend
    pub enable_redis_cache: bool,
    /// Namespace prepended to every key
    pub cache_prefix: String,
    /// Fallback TTL in seconds for the Redis backend
    pub redis_default_ttl_seconds: u64,
    /// Redis URL used for writes (and reads when no read URL is set)
    pub redis_url: String,
    /// Optional Redis URL for reads, e.g. a replica
    pub redis_read_url: Option<String>,
    /// Fallback TTL in seconds for the in-process backend
    pub memory_default_ttl_seconds: u64,
    /// Maximum number of entries held in process
    pub memory_max_entries: usize,
    /// Interval in seconds between expired-entry sweeps, 0 disables the sweeper
    pub memory_check_period_seconds: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ENABLE_CACHE` (default: true)
    /// - `ENABLE_MEMORY_CACHE` (default: true)
    /// - `ENABLE_REDIS_CACHE` (default: false)
    /// - `CACHE_PREFIX` (default: empty)
    /// - `REDIS_DEFAULT_TTL_SECONDS` (default: 3600)
    /// - `REDIS_URL` (default: redis://127.0.0.1:6379)
    /// - `REDIS_READ_URL` (default: unset, reads use `REDIS_URL`)
    /// - `MEMORY_DEFAULT_TTL_SECONDS` (default: 300)
    /// - `MEMORY_MAX_ENTRIES` (default: 10000)
    /// - `MEMORY_CHECK_PERIOD_SECONDS` (default: 60)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            enable_cache: lookup("ENABLE_CACHE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enable_cache),
            enable_memory_cache: lookup("ENABLE_MEMORY_CACHE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enable_memory_cache),
            enable_redis_cache: lookup("ENABLE_REDIS_CACHE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enable_redis_cache),
            cache_prefix: lookup("CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            redis_default_ttl_seconds: parsed(&lookup, "REDIS_DEFAULT_TTL_SECONDS")
                .unwrap_or(defaults.redis_default_ttl_seconds),
            redis_url: lookup("REDIS_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.redis_url),
            redis_read_url: lookup("REDIS_READ_URL").filter(|v| !v.trim().is_empty()),
            memory_default_ttl_seconds: parsed(&lookup, "MEMORY_DEFAULT_TTL_SECONDS")
                .unwrap_or(defaults.memory_default_ttl_seconds),
            memory_max_entries: parsed(&lookup, "MEMORY_MAX_ENTRIES")
                .unwrap_or(defaults.memory_max_entries),
            memory_check_period_seconds: parsed(&lookup, "MEMORY_CHECK_PERIOD_SECONDS")
                .unwrap_or(defaults.memory_check_period_seconds),
        }
    }

    /// URL for the read connection.
    pub fn redis_read_url(&self) -> &str {
        self.redis_read_url.as_deref().unwrap_or(&self.redis_url)
    }

    /// Checks values that would make a backend unusable.
    pub fn validate(&self) -> Result<()> {
        if self.enable_redis_cache && self.redis_default_ttl_seconds == 0 {
            return Err(CacheError::Config(
                "REDIS_DEFAULT_TTL_SECONDS must be greater than zero".to_string(),
            ));
        }
        if self.enable_memory_cache && self.memory_max_entries == 0 {
            return Err(CacheError::Config(
                "MEMORY_MAX_ENTRIES must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            enable_memory_cache: true,
            enable_redis_cache: false,
            cache_prefix: String::new(),
            redis_default_ttl_seconds: 3600,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_read_url: None,
            memory_default_ttl_seconds: 300,
            memory_max_entries: 10_000,
            memory_check_period_seconds: 60,
        }
    }
}

fn parsed<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> CacheConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CacheConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert!(config.enable_cache);
        assert!(config.enable_memory_cache);
        assert!(!config.enable_redis_cache);
        assert_eq!(config.cache_prefix, "");
        assert_eq!(config.redis_default_ttl_seconds, 3600);
        assert_eq!(config.memory_default_ttl_seconds, 300);
        assert_eq!(config.memory_check_period_seconds, 60);
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        assert_eq!(config_from(&[]), CacheConfig::default());
    }

    #[test]
    fn test_flags_and_prefix() {
        let config = config_from(&[
            ("ENABLE_CACHE", "yes"),
            ("ENABLE_MEMORY_CACHE", "false"),
            ("ENABLE_REDIS_CACHE", "TRUE"),
            ("CACHE_PREFIX", "tcg"),
            ("REDIS_DEFAULT_TTL_SECONDS", "120"),
        ]);
        assert!(config.enable_cache);
        assert!(!config.enable_memory_cache);
        assert!(config.enable_redis_cache);
        assert_eq!(config.cache_prefix, "tcg");
        assert_eq!(config.redis_default_ttl_seconds, 120);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config_from(&[
            ("ENABLE_CACHE", "maybe"),
            ("REDIS_DEFAULT_TTL_SECONDS", "soon"),
            ("MEMORY_MAX_ENTRIES", "-3"),
        ]);
        assert!(config.enable_cache);
        assert_eq!(config.redis_default_ttl_seconds, 3600);
        assert_eq!(config.memory_max_entries, 10_000);
    }

    #[test]
    fn test_read_url_falls_back_to_write_url() {
        let config = config_from(&[("REDIS_URL", "redis://primary:6379")]);
        assert_eq!(config.redis_read_url(), "redis://primary:6379");

        let config = config_from(&[
            ("REDIS_URL", "redis://primary:6379"),
            ("REDIS_READ_URL", "redis://replica:6379"),
        ]);
        assert_eq!(config.redis_read_url(), "redis://replica:6379");
    }

    #[test]
    fn test_validate_rejects_zero_redis_ttl() {
        let config = CacheConfig {
            enable_redis_cache: true,
            redis_default_ttl_seconds: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_validate_ignores_disabled_backends() {
        let config = CacheConfig {
            enable_memory_cache: false,
            memory_max_entries: 0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
