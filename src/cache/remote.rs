//! Redis Cache Provider
//!
//! Distributed cache backed by Redis, shared by every server instance.
//!
//! ## Layout
//!
//! - Reads go to a read connection and writes to a write connection, so reads can
//!   be pointed at a replica.
//! - Values are stored as a JSON envelope carrying the payload and its freshness
//!   marker. Eviction uses Redis' native key expiry.
//! - Store errors are returned unchanged. Retries belong to the connection layer.
//!
//! ## Example
//!
//! ```ignore
//! use cache_service::cache::{KeyPrefix, RedisCacheProvider};
//!
//! let cache = RedisCacheProvider::connect(
//!     "redis://replica:6379",
//!     "redis://primary:6379",
//!     KeyPrefix::new("tcg"),
//!     3600,
//! )
//! .await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::provider::{require_key, validate_set, validate_ttl_change, KeyPrefix};
use crate::cache::{expires_in, CacheEntry, CacheProvider, ExpirationInfo, Ttl};
use crate::error::{CacheError, Result};

// == Connection Contract ==
/// The subset of Redis commands the provider needs.
///
/// Implemented for [`ConnectionManager`]; anything else speaking the same
/// commands (a test double, a cluster client) can stand in.
#[async_trait]
pub trait KvConnection: Send + Sync {
    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET key value EX ttl_seconds`
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// `DEL key`, true if a key was removed
    async fn del(&self, key: &str) -> Result<bool>;

    /// `TTL key`: `-2` missing, `-1` no expiry, otherwise seconds
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// `EXPIRE key ttl_seconds`, false if the key does not exist
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool>;
}

#[async_trait]
impl KvConnection for ConnectionManager {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.clone();
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(ttl)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool> {
        let mut conn = self.clone();
        let applied: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }
}

// == Stored Envelope ==
/// What actually lives under a Redis key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub data: Value,
    #[serde(default)]
    pub data_expiration_date: Option<DateTime<Utc>>,
}

impl Envelope {
    fn decode(key: &str, raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| {
            warn!(key, error = %source, "undecodable payload in redis cache");
            CacheError::DecodeFailure {
                key: key.to_string(),
                source,
            }
        })
    }

    fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(CacheError::Encode)
    }
}

// == Redis Cache Provider ==
pub struct RedisCacheProvider<C = ConnectionManager> {
    read: C,
    write: C,
    prefix: KeyPrefix,
    default_ttl: u64,
}

impl RedisCacheProvider<ConnectionManager> {
    /// Opens managed connections to the read and write endpoints.
    ///
    /// The same URL may be passed for both.
    pub async fn connect(
        read_url: &str,
        write_url: &str,
        prefix: KeyPrefix,
        default_ttl: u64,
    ) -> Result<Self> {
        let write = ConnectionManager::new(Client::open(write_url)?).await?;
        let read = if read_url == write_url {
            write.clone()
        } else {
            ConnectionManager::new(Client::open(read_url)?).await?
        };

        info!(
            replica_reads = read_url != write_url,
            prefix = prefix.as_str(),
            default_ttl,
            "redis cache connected"
        );
        Ok(Self::new(read, write, prefix, default_ttl))
    }
}

impl<C: KvConnection> RedisCacheProvider<C> {
    /// Wraps existing read and write handles.
    pub fn new(read: C, write: C, prefix: KeyPrefix, default_ttl: u64) -> Self {
        Self {
            read,
            write,
            prefix,
            default_ttl,
        }
    }

    async fn fetch(&self, key: &str, namespaced: &str) -> Result<Option<Envelope>> {
        match self.read.get(namespaced).await? {
            Some(raw) => Envelope::decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<C: KvConnection> CacheProvider for RedisCacheProvider<C> {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<CacheEntry> {
        validate_set(key, &value, ttl_seconds)?;
        let expiration = ExpirationInfo::from_now(ttl_seconds);
        let envelope = Envelope {
            data: value,
            data_expiration_date: expiration.data_expiration_date,
        };

        self.write
            .set_ex(&self.prefix.apply(key), &envelope.encode()?, ttl_seconds)
            .await?;

        debug!(key, ttl_seconds, "redis cache set");
        Ok(CacheEntry {
            key: key.to_string(),
            value: envelope.data,
            expiration,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        require_key(key)?;
        let namespaced = self.prefix.apply(key);

        let Some(envelope) = self.fetch(key, &namespaced).await? else {
            debug!(key, "redis cache miss");
            return Ok(None);
        };
        let provider_expiration_date = match Ttl::from_redis(self.read.ttl(&namespaced).await?) {
            // Evicted between the two reads.
            Ttl::Missing => return Ok(None),
            ttl => ttl.expiration_date(),
        };

        debug!(key, "redis cache hit");
        Ok(Some(CacheEntry {
            key: key.to_string(),
            value: envelope.data,
            expiration: ExpirationInfo {
                provider_expiration_date,
                data_expiration_date: envelope.data_expiration_date,
            },
        }))
    }

    async fn del(&self, key: &str) -> Result<()> {
        require_key(key)?;
        let removed = self.write.del(&self.prefix.apply(key)).await?;
        debug!(key, removed, "redis cache del");
        Ok(())
    }

    async fn provider_ttl(&self, key: &str) -> Result<Ttl> {
        require_key(key)?;
        let raw = self.read.ttl(&self.prefix.apply(key)).await?;
        Ok(Ttl::from_redis(raw))
    }

    async fn data_ttl(&self, key: &str) -> Result<Ttl> {
        require_key(key)?;
        let envelope = self.fetch(key, &self.prefix.apply(key)).await?;
        Ok(match envelope {
            None => Ttl::Missing,
            Some(Envelope {
                data_expiration_date: None,
                ..
            }) => Ttl::Persistent,
            Some(Envelope {
                data_expiration_date: Some(at),
                ..
            }) => Ttl::until(at),
        })
    }

    async fn change_provider_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<DateTime<Utc>>> {
        validate_ttl_change(key, ttl_seconds)?;
        let applied = self
            .write
            .expire(&self.prefix.apply(key), ttl_seconds)
            .await?;

        debug!(key, ttl_seconds, applied, "redis cache provider ttl change");
        Ok(applied.then(|| expires_in(ttl_seconds)))
    }

    /// Read-modify-write of the envelope. A concurrent `set` on the same key between
    /// the read and the write is overwritten.
    async fn change_data_ttl(
        &self,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<Option<ExpirationInfo>> {
        validate_ttl_change(key, ttl_seconds)?;
        let namespaced = self.prefix.apply(key);

        let Some(mut envelope) = self.fetch(key, &namespaced).await? else {
            return Ok(None);
        };
        let expiration = ExpirationInfo::from_now(ttl_seconds);
        envelope.data_expiration_date = expiration.data_expiration_date;
        self.write
            .set_ex(&namespaced, &envelope.encode()?, ttl_seconds)
            .await?;

        debug!(key, ttl_seconds, "redis cache data ttl change");
        Ok(Some(expiration))
    }
}

impl<C> fmt::Debug for RedisCacheProvider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheProvider")
            .field("prefix", &self.prefix.as_str())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
