//! Memory Store Module
//!
//! Expiring key/value store held in process memory, with LRU eviction at capacity.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::store::{current_timestamp_ms, CacheStats, LruTracker, StoredValue};

// == Memory Store ==
/// In-process store with per-key TTL.
///
/// A TTL of `0` stores a value without expiration.
#[derive(Debug)]
pub struct MemoryStore {
    entries: HashMap<String, StoredValue>,
    lru: LruTracker,
    stats: CacheStats,
    max_entries: usize,
    /// TTL in seconds applied when `set` receives `None`
    default_ttl: u64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` values.
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    // == Set ==
    /// Stores a value, replacing any previous one and restarting its clock.
    ///
    /// If the store is at capacity, the least recently used entry is evicted.
    pub fn set(&mut self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            match self.lru.evict_oldest() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
                None => {
                    return Err(CacheError::CacheFull(format!(
                        "store holds {} entries and nothing can be evicted",
                        self.entries.len()
                    )))
                }
            }
        }

        let slot = StoredValue::new(value, ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key.to_string(), slot);
        self.lru.touch(key);
        Ok(())
    }

    // == Get ==
    /// Returns a live value. Expired values are dropped and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if self.drop_if_expired(key) {
            self.stats.record_miss();
            return None;
        }
        match self.entries.get(key) {
            Some(slot) => {
                let value = slot.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes a value, returning whether one was present.
    pub fn del(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }

    // == Get TTL ==
    /// Absolute expiry of a live key.
    ///
    /// - `None` if the key is absent or expired
    /// - `Some(0)` if the key never expires
    /// - `Some(epoch_ms)` otherwise
    pub fn get_ttl(&self, key: &str) -> Option<u64> {
        let now = current_timestamp_ms();
        self.entries
            .get(key)
            .filter(|slot| !slot.is_expired_at(now))
            .map(|slot| slot.expires_at.unwrap_or(0))
    }

    // == Change TTL ==
    /// Restarts the expiration clock of a live key. `0` removes the expiration.
    ///
    /// Returns false if the key is absent or already expired.
    pub fn ttl(&mut self, key: &str, ttl_seconds: u64) -> bool {
        if self.drop_if_expired(key) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.reset_ttl(ttl_seconds);
                true
            }
            None => false,
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        self.stats.record_expirations(expired.len());
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.keys = self.entries.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn drop_if_expired(&mut self, key: &str) -> bool {
        let expired = self.entries.get(key).is_some_and(StoredValue::is_expired);
        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_expirations(1);
        }
        expired
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_new() {
        let store = MemoryStore::new(100, 300);
        assert!(store.is_empty());
        assert_eq!(store.default_ttl(), 300);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = MemoryStore::new(100, 300);

        store.set("key1", json!({"name": "a"}), None).unwrap();

        assert_eq!(store.get("key1"), Some(json!({"name": "a"})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = MemoryStore::new(100, 300);
        assert!(store.get("nonexistent").is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let mut store = MemoryStore::new(100, 300);

        store.set("key1", json!(1), None).unwrap();
        assert!(store.del("key1"));
        assert!(!store.del("key1"));
        assert!(store.get("key1").is_none());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = MemoryStore::new(100, 300);

        store.set("key1", json!("value1"), Some(5)).unwrap();
        store.set("key1", json!("value2"), Some(50)).unwrap();

        assert_eq!(store.get("key1"), Some(json!("value2")));
        assert_eq!(store.len(), 1);
        let expires = store.get_ttl("key1").unwrap();
        assert!(expires > current_timestamp_ms() + 45_000);
    }

    #[test]
    fn test_get_ttl_three_states() {
        let mut store = MemoryStore::new(100, 300);
        store.set("forever", json!(true), Some(0)).unwrap();
        store.set("timed", json!(true), Some(10)).unwrap();

        assert_eq!(store.get_ttl("forever"), Some(0));
        assert_eq!(store.get_ttl("missing"), None);

        let expires = store.get_ttl("timed").unwrap();
        let now = current_timestamp_ms();
        assert!(expires > now && expires <= now + 10_000);
    }

    #[test]
    fn test_ttl_change_keeps_value() {
        let mut store = MemoryStore::new(100, 300);
        store.set("key1", json!([1, 2, 3]), Some(5)).unwrap();

        assert!(store.ttl("key1", 20));
        assert!(!store.ttl("missing", 20));

        let expires = store.get_ttl("key1").unwrap();
        assert!(expires > current_timestamp_ms() + 15_000);
        assert_eq!(store.get("key1"), Some(json!([1, 2, 3])));

        assert!(store.ttl("key1", 0));
        assert_eq!(store.get_ttl("key1"), Some(0));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = MemoryStore::new(100, 300);

        store.set("key1", json!("value1"), Some(1)).unwrap();
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert!(store.get_ttl("key1").is_none());
        assert!(!store.ttl("key1", 10));
        assert!(store.get("key1").is_none());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = MemoryStore::new(3, 300);

        store.set("key1", json!(1), None).unwrap();
        store.set("key2", json!(2), None).unwrap();
        store.set("key3", json!(3), None).unwrap();
        store.get("key1");
        store.set("key4", json!(4), None).unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.get("key2").is_none());
        assert!(store.get("key1").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_zero_capacity_is_full() {
        let mut store = MemoryStore::new(0, 300);
        let result = store.set("key1", json!(1), None);
        assert!(matches!(result, Err(CacheError::CacheFull(_))));
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = MemoryStore::new(100, 300);

        store.set("key1", json!(1), Some(1)).unwrap();
        store.set("key2", json!(2), Some(10)).unwrap();

        sleep(Duration::from_millis(1100));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().keys, 1);
        assert!(store.get("key2").is_some());
    }
}
