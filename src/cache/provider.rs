//! Cache Provider Contract
//!
//! The operations every backend implements, plus shared argument checks.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{CacheEntry, ExpirationInfo, Ttl};
use crate::error::{CacheError, Result};

/// Uniform cache backend.
///
/// Every operation validates its arguments before touching the backend and
/// rejects bad input with [`CacheError::InvalidArgument`].
#[async_trait]
pub trait CacheProvider: Send + Sync + Debug {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// TTL in seconds used by [`CacheProvider::set_default`].
    fn default_ttl(&self) -> u64;

    /// Stores `value` under `key`, starting both clocks at `now + ttl_seconds`.
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<CacheEntry>;

    /// Returns the entry with its current expiration info, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Removes the entry. Removing an absent key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Remaining time on the backend's eviction clock.
    async fn provider_ttl(&self, key: &str) -> Result<Ttl>;

    /// Remaining time on the payload's freshness window.
    async fn data_ttl(&self, key: &str) -> Result<Ttl>;

    /// Restarts the eviction clock without touching the value.
    ///
    /// Returns the new eviction instant, or `None` if the key is absent.
    async fn change_provider_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<DateTime<Utc>>>;

    /// Restarts the freshness window without touching the business payload.
    ///
    /// Returns the resulting clocks, or `None` if the key is absent.
    async fn change_data_ttl(&self, key: &str, ttl_seconds: u64)
        -> Result<Option<ExpirationInfo>>;

    /// Stores `value` with the backend's default TTL.
    async fn set_default(&self, key: &str, value: Value) -> Result<CacheEntry> {
        self.set(key, value, self.default_ttl()).await
    }
}

// == Argument Checks ==

pub(crate) fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::invalid("key must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_value(value: &Value) -> Result<()> {
    if value.is_null() {
        return Err(CacheError::invalid("value must be present"));
    }
    Ok(())
}

pub(crate) fn require_ttl(ttl_seconds: u64) -> Result<()> {
    if ttl_seconds == 0 {
        return Err(CacheError::invalid("ttl must be greater than zero"));
    }
    Ok(())
}

pub(crate) fn validate_set(key: &str, value: &Value, ttl_seconds: u64) -> Result<()> {
    require_key(key)?;
    require_value(value)?;
    require_ttl(ttl_seconds)
}

pub(crate) fn validate_ttl_change(key: &str, ttl_seconds: u64) -> Result<()> {
    require_key(key)?;
    require_ttl(ttl_seconds)
}

// == Key Namespace ==
/// Prepends the configured namespace to caller keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// `prefix:key`, or `key` unchanged when no prefix is configured.
    pub fn apply(&self, key: &str) -> String {
        if self.0.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.0, key)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
