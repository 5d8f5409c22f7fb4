//! In-Process Cache Provider
//!
//! Implements the provider contract over [`MemoryStore`]. Both TTL clocks are the
//! store's single per-key expiration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::provider::{require_key, validate_set, validate_ttl_change, KeyPrefix};
use crate::cache::{expires_in, CacheEntry, CacheProvider, ExpirationInfo, Ttl};
use crate::error::Result;
use crate::store::{current_timestamp_ms, CacheStats, MemoryStore};

/// Shared handle to the in-process store.
pub type SharedStore = Arc<RwLock<MemoryStore>>;

// == Memory Cache Provider ==
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    store: SharedStore,
    prefix: KeyPrefix,
    default_ttl: u64,
}

impl MemoryCacheProvider {
    /// Creates a provider over a fresh store.
    ///
    /// # Arguments
    /// * `max_entries` - Capacity before LRU eviction kicks in
    /// * `default_ttl` - TTL in seconds for `set_default`
    /// * `prefix` - Namespace prepended to every key
    pub fn new(max_entries: usize, default_ttl: u64, prefix: KeyPrefix) -> Self {
        let store = MemoryStore::new(max_entries, default_ttl);
        Self::with_store(Arc::new(RwLock::new(store)), default_ttl, prefix)
    }

    /// Creates a provider over a store owned by the host process.
    pub fn with_store(store: SharedStore, default_ttl: u64, prefix: KeyPrefix) -> Self {
        Self {
            store,
            prefix,
            default_ttl,
        }
    }

    /// Handle to the underlying store, e.g. for the cleanup task.
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    async fn read_ttl(&self, key: &str) -> Result<Ttl> {
        require_key(key)?;
        let raw = self.store.read().await.get_ttl(&self.prefix.apply(key));
        Ok(ttl_from_epoch_ms(raw))
    }

    /// Single TTL mutation routine behind both `change_*_ttl` operations.
    async fn reset_ttl(&self, key: &str, ttl_seconds: u64) -> Result<Option<ExpirationInfo>> {
        validate_ttl_change(key, ttl_seconds)?;
        let changed = self
            .store
            .write()
            .await
            .ttl(&self.prefix.apply(key), ttl_seconds);

        debug!(key, ttl_seconds, changed, "memory cache ttl reset");
        Ok(changed.then(|| ExpirationInfo::from_now(ttl_seconds)))
    }
}

/// Translates the store's absolute expiry into remaining seconds.
///
/// `None` is a missing key, `0` means no expiration.
fn ttl_from_epoch_ms(raw: Option<u64>) -> Ttl {
    match raw {
        None => Ttl::Missing,
        Some(0) => Ttl::Persistent,
        Some(expires_ms) => {
            let remaining = expires_ms.saturating_sub(current_timestamp_ms());
            Ttl::Remaining(remaining.div_ceil(1000))
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<CacheEntry> {
        validate_set(key, &value, ttl_seconds)?;
        self.store
            .write()
            .await
            .set(&self.prefix.apply(key), value.clone(), Some(ttl_seconds))?;

        debug!(key, ttl_seconds, "memory cache set");
        Ok(CacheEntry {
            key: key.to_string(),
            value,
            expiration: ExpirationInfo::from_now(ttl_seconds),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        require_key(key)?;
        let namespaced = self.prefix.apply(key);

        let mut store = self.store.write().await;
        let Some(value) = store.get(&namespaced) else {
            debug!(key, "memory cache miss");
            return Ok(None);
        };
        let expiration = match ttl_from_epoch_ms(store.get_ttl(&namespaced)) {
            Ttl::Missing => return Ok(None),
            Ttl::Persistent => ExpirationInfo::unified(None),
            Ttl::Remaining(secs) => ExpirationInfo::unified(Some(expires_in(secs))),
        };

        debug!(key, "memory cache hit");
        Ok(Some(CacheEntry {
            key: key.to_string(),
            value,
            expiration,
        }))
    }

    async fn del(&self, key: &str) -> Result<()> {
        require_key(key)?;
        let removed = self.store.write().await.del(&self.prefix.apply(key));
        debug!(key, removed, "memory cache del");
        Ok(())
    }

    async fn provider_ttl(&self, key: &str) -> Result<Ttl> {
        self.read_ttl(key).await
    }

    async fn data_ttl(&self, key: &str) -> Result<Ttl> {
        self.read_ttl(key).await
    }

    async fn change_provider_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .reset_ttl(key, ttl_seconds)
            .await?
            .and_then(|info| info.provider_expiration_date))
    }

    async fn change_data_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<ExpirationInfo>> {
        self.reset_ttl(key, ttl_seconds).await
    }
}
