//! Error types for the cache core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache core.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The caller-supplied fetch function failed
    #[error("Fetch failed for key '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Durable storage operation failed (always swallowed at the adapter
    /// boundary; carried here so the failure hook can observe it)
    #[error("Storage {operation} failed for key '{key}': {source}")]
    Storage {
        operation: &'static str,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Entry could not be serialized for, or deserialized from, the durable tier
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid cache key (empty or over the length limit)
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl CacheError {
    /// Builds a fetch error from the opaque failure the fetch function returned.
    pub fn fetch(key: impl Into<String>, source: anyhow::Error) -> Self {
        CacheError::Fetch {
            key: key.into(),
            source,
        }
    }

    /// Builds a storage error for a key and operation name.
    pub fn storage(operation: &'static str, key: impl Into<String>, source: anyhow::Error) -> Self {
        CacheError::Storage {
            operation,
            key: key.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache core.
pub type Result<T> = std::result::Result<T, CacheError>;
