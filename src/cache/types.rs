//! Cache Value Types
//!
//! Entries, expiration info and the three-state TTL result shared by every backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Expiration Info ==
/// The two expiration clocks of an entry.
///
/// `None` means the clock never runs out. Backends that do not distinguish the
/// clocks report the same instant in both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationInfo {
    /// When the backend evicts the entry on its own
    pub provider_expiration_date: Option<DateTime<Utc>>,
    /// When the payload stops being fresh for the application
    pub data_expiration_date: Option<DateTime<Utc>>,
}

impl ExpirationInfo {
    /// Both clocks set to the same instant.
    pub fn unified(at: Option<DateTime<Utc>>) -> Self {
        Self {
            provider_expiration_date: at,
            data_expiration_date: at,
        }
    }

    /// Both clocks set to `now + ttl_seconds`.
    pub fn from_now(ttl_seconds: u64) -> Self {
        Self::unified(Some(expires_in(ttl_seconds)))
    }
}

/// Longest TTL representable as an expiration date (about 100 years).
const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// Instant `ttl_seconds` from now.
pub fn expires_in(ttl_seconds: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_seconds)
        .unwrap_or(MAX_TTL_SECONDS)
        .min(MAX_TTL_SECONDS);
    Utc::now() + Duration::seconds(secs)
}

// == Cache Entry ==
/// A cached value as returned by `set` and `get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The key as the caller supplied it, without namespace prefix
    pub key: String,
    pub value: Value,
    #[serde(flatten)]
    pub expiration: ExpirationInfo,
}

// == TTL ==
/// Result of a TTL read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Seconds left before the clock runs out.
    ///
    /// `Remaining(0)` means the clock is in its last second, or that a data
    /// clock has lapsed while the key itself is still stored.
    Remaining(u64),
    /// The key exists but never expires
    Persistent,
    /// The key does not exist
    Missing,
}

impl Ttl {
    /// Maps a Redis `TTL` reply: `-2` missing, `-1` persistent, otherwise seconds.
    pub fn from_redis(raw: i64) -> Self {
        match raw {
            -1 => Ttl::Persistent,
            n if n >= 0 => Ttl::Remaining(n as u64),
            _ => Ttl::Missing,
        }
    }

    /// Remaining time until `at`, clamped at zero and rounded up to whole seconds.
    pub fn until(at: DateTime<Utc>) -> Self {
        let ms = (at - Utc::now()).num_milliseconds().max(0) as u64;
        Ttl::Remaining(ms.div_ceil(1000))
    }

    /// `Some(seconds)`, `Some(-1)` for no expiration, `None` for a missing key.
    pub fn as_raw(self) -> Option<i64> {
        match self {
            Ttl::Remaining(secs) => Some(i64::try_from(secs).unwrap_or(i64::MAX)),
            Ttl::Persistent => Some(-1),
            Ttl::Missing => None,
        }
    }

    pub fn seconds(self) -> Option<u64> {
        match self {
            Ttl::Remaining(secs) => Some(secs),
            _ => None,
        }
    }

    pub fn exists(self) -> bool {
        !matches!(self, Ttl::Missing)
    }

    /// Expiration instant implied by this TTL, if the key exists and expires.
    pub fn expiration_date(self) -> Option<DateTime<Utc>> {
        self.seconds().map(expires_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ttl_from_redis() {
        assert_eq!(Ttl::from_redis(-2), Ttl::Missing);
        assert_eq!(Ttl::from_redis(-1), Ttl::Persistent);
        assert_eq!(Ttl::from_redis(0), Ttl::Remaining(0));
        assert_eq!(Ttl::from_redis(42), Ttl::Remaining(42));
    }

    #[test]
    fn test_ttl_raw_states_are_distinct() {
        assert_eq!(Ttl::Remaining(7).as_raw(), Some(7));
        assert_eq!(Ttl::Persistent.as_raw(), Some(-1));
        assert_eq!(Ttl::Missing.as_raw(), None);
        assert!(Ttl::Persistent.exists());
        assert!(!Ttl::Missing.exists());
        assert_eq!(Ttl::Persistent.seconds(), None);
    }

    #[test]
    fn test_ttl_until_rounds_up_and_clamps() {
        let ttl = Ttl::until(expires_in(10));
        assert!(matches!(ttl, Ttl::Remaining(s) if (9..=10).contains(&s)));

        let past = Utc::now() - Duration::seconds(30);
        assert_eq!(Ttl::until(past), Ttl::Remaining(0));
    }

    #[test]
    fn test_expiration_info_from_now_is_unified() {
        let info = ExpirationInfo::from_now(60);
        assert_eq!(info.provider_expiration_date, info.data_expiration_date);
        assert!(info.provider_expiration_date.unwrap() > Utc::now());
    }

    #[test]
    fn test_entry_serializes_iso_dates() {
        let entry = CacheEntry {
            key: "u:1".to_string(),
            value: json!({"name": "a"}),
            expiration: ExpirationInfo::from_now(10),
        };
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["key"], "u:1");
        assert_eq!(json["value"]["name"], "a");
        let provider = json["providerExpirationDate"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(provider).is_ok());
        assert_eq!(json["providerExpirationDate"], json["dataExpirationDate"]);
    }
}
