//! Stored Value Module
//!
//! A value held by the in-process store together with its expiration clock.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Stored Value ==
/// A single slot of the in-process store.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored payload
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a new slot. A TTL of zero means the value never expires.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: expiry_from(current_timestamp_ms(), ttl_seconds),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub(crate) fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now_ms >= expires)
    }

    // == Reset TTL ==
    /// Restarts the expiration clock from now without touching the value.
    pub fn reset_ttl(&mut self, ttl_seconds: u64) {
        self.expires_at = expiry_from(current_timestamp_ms(), ttl_seconds);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the entry has expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

fn expiry_from(now_ms: u64, ttl_seconds: u64) -> Option<u64> {
    (ttl_seconds > 0).then(|| now_ms.saturating_add(ttl_seconds.saturating_mul(1000)))
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
