//! Cache Service - two-tier cache for the card information site
//!
//! One provider contract with an in-process backend and a Redis backend. Every entry
//! carries a provider TTL (backend eviction) and a data TTL (application freshness).

pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod tasks;

pub use cache::{CacheEntry, CacheProvider, CacheService, ExpirationInfo, Ttl};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
