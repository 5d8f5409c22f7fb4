//! Cache Module
//!
//! Provider-polymorphic cache with separate provider and data TTL clocks.
//!
//! - [`CacheProvider`] is the contract every backend satisfies
//! - [`MemoryCacheProvider`] keeps entries in process memory
//! - [`RedisCacheProvider`] shares entries between instances through Redis
//! - [`CacheService`] selects a backend from configuration

mod memory;
mod provider;
mod remote;
mod service;
mod types;


pub use memory::{MemoryCacheProvider, SharedStore};
pub use provider::{CacheProvider, KeyPrefix};
pub use remote::{Envelope, KvConnection, RedisCacheProvider};
pub use service::CacheService;
pub use types::{expires_in, CacheEntry, ExpirationInfo, Ttl};
