//! Cache Service
//!
//! Façade that picks a backend from configuration and hands it to consumers.
//! The in-process backend wins when enabled, then Redis. With neither (or with the
//! cache switched off) every call bypasses the cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::provider::{
    require_key, require_value, validate_set, validate_ttl_change, KeyPrefix,
};
use crate::cache::{
    CacheEntry, CacheProvider, ExpirationInfo, MemoryCacheProvider, RedisCacheProvider, Ttl,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;

// == Cache Service ==
#[derive(Debug, Default)]
pub struct CacheService {
    memory: Option<Arc<dyn CacheProvider>>,
    remote: Option<Arc<dyn CacheProvider>>,
    enabled: bool,
    cleanup: Option<JoinHandle<()>>,
}

impl CacheService {
    /// Wires already-built providers.
    pub fn new(
        memory: Option<Arc<dyn CacheProvider>>,
        remote: Option<Arc<dyn CacheProvider>>,
        enabled: bool,
    ) -> Self {
        Self {
            memory,
            remote,
            enabled,
            cleanup: None,
        }
    }

    /// A service that never caches.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Builds the enabled backends, connects to Redis and starts the sweeper.
    ///
    /// Redis is only connected when it can be selected, i.e. when the in-process
    /// backend is off. The sweeper is spawned last so a failed connect leaves no
    /// task behind.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        if !config.enable_cache {
            info!("cache disabled, all operations bypass");
            return Ok(Self::disabled());
        }

        let prefix = KeyPrefix::new(config.cache_prefix.clone());

        let memory = config.enable_memory_cache.then(|| {
            MemoryCacheProvider::new(
                config.memory_max_entries,
                config.memory_default_ttl_seconds,
                prefix.clone(),
            )
        });

        let remote: Option<Arc<dyn CacheProvider>> = match (&memory, config.enable_redis_cache) {
            (None, true) => {
                let provider = RedisCacheProvider::connect(
                    config.redis_read_url(),
                    &config.redis_url,
                    prefix,
                    config.redis_default_ttl_seconds,
                )
                .await?;
                Some(Arc::new(provider))
            }
            (Some(_), true) => {
                info!("memory cache enabled, redis cache not connected");
                None
            }
            (_, false) => None,
        };

        let cleanup = match &memory {
            Some(provider) if config.memory_check_period_seconds > 0 => Some(spawn_cleanup_task(
                provider.store(),
                config.memory_check_period_seconds,
            )),
            _ => None,
        };

        let memory = memory.map(|provider| Arc::new(provider) as Arc<dyn CacheProvider>);
        let mut service = Self::new(memory, remote, true);
        service.cleanup = cleanup;
        info!(
            backend = service.backend_name().unwrap_or("none"),
            "cache service ready"
        );
        Ok(service)
    }

    /// The backend operations go to, or `None` when bypassing.
    pub fn active(&self) -> Option<&Arc<dyn CacheProvider>> {
        if !self.enabled {
            return None;
        }
        self.memory.as_ref().or(self.remote.as_ref())
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.active().map(|provider| provider.name())
    }

    pub fn is_bypassed(&self) -> bool {
        self.active().is_none()
    }

    // == Contract Operations ==

    /// Stores a value. Returns `None` when bypassing.
    pub async fn set(
        &self,
        key: &str,
        value: Value,
        ttl_seconds: u64,
    ) -> Result<Option<CacheEntry>> {
        validate_set(key, &value, ttl_seconds)?;
        match self.active() {
            Some(provider) => provider.set(key, value, ttl_seconds).await.map(Some),
            None => Ok(None),
        }
    }

    /// Stores a value with the active backend's default TTL.
    pub async fn set_default(&self, key: &str, value: Value) -> Result<Option<CacheEntry>> {
        require_key(key)?;
        require_value(&value)?;
        match self.active() {
            Some(provider) => provider.set_default(key, value).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        require_key(key)?;
        match self.active() {
            Some(provider) => provider.get(key).await,
            None => Ok(None),
        }
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        require_key(key)?;
        match self.active() {
            Some(provider) => provider.del(key).await,
            None => Ok(()),
        }
    }

    pub async fn provider_ttl(&self, key: &str) -> Result<Ttl> {
        require_key(key)?;
        match self.active() {
            Some(provider) => provider.provider_ttl(key).await,
            None => Ok(Ttl::Missing),
        }
    }

    pub async fn data_ttl(&self, key: &str) -> Result<Ttl> {
        require_key(key)?;
        match self.active() {
            Some(provider) => provider.data_ttl(key).await,
            None => Ok(Ttl::Missing),
        }
    }

    pub async fn change_provider_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<DateTime<Utc>>> {
        validate_ttl_change(key, ttl_seconds)?;
        match self.active() {
            Some(provider) => provider.change_provider_ttl(key, ttl_seconds).await,
            None => Ok(None),
        }
    }

    pub async fn change_data_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<ExpirationInfo>> {
        validate_ttl_change(key, ttl_seconds)?;
        match self.active() {
            Some(provider) => provider.change_data_ttl(key, ttl_seconds).await,
            None => Ok(None),
        }
    }

    // == Typed Helpers ==

    /// Serializes `value` and stores it.
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<Option<CacheEntry>> {
        let value = serde_json::to_value(value).map_err(CacheError::Encode)?;
        self.set(key, value, ttl_seconds).await
    }

    /// Reads a value back into `T`.
    ///
    /// A stored value that does not fit `T` is a [`CacheError::DecodeFailure`].
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(entry) = self.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_value(entry.value)
            .map(Some)
            .map_err(|source| CacheError::DecodeFailure {
                key: key.to_string(),
                source,
            })
    }

    // == Lifecycle ==

    /// Stops the background sweeper.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
            info!("memory cache cleanup task aborted");
        }
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
