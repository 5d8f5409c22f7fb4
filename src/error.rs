//! Error types for the cache service
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend and the service façade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Missing key, value or TTL. Raised before any backend call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the remote store, passed through unchanged
    #[error("Backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Stored payload could not be parsed back
    #[error("Failed to decode cached payload for key '{key}': {source}")]
    DecodeFailure {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Caller value could not be serialized
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// In-process store is full and nothing could be evicted
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Shorthand for building an [`CacheError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        CacheError::InvalidArgument(msg.into())
    }

    /// Returns true for caller mistakes, as opposed to backend or data failures.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CacheError::InvalidArgument(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache service.
pub type Result<T> = std::result::Result<T, CacheError>;
