//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// == Cache Entry ==
/// Represents a single cache entry with value and timing metadata.
///
/// The value type is opaque to the cache; the shared namespace stores
/// entries as `CacheEntry<Value>` so that differently-typed consumers can
/// share one namespace, while typed handles convert at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored value
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds); always >= created_at
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` after now.
    pub fn new(data: T, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        Self {
            data,
            created_at: now,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current
    /// time is greater than or equal to the expiration time, so once the TTL
    /// duration has fully elapsed the entry is immediately expired.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or 0 if the entry has expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

impl<T: Serialize> CacheEntry<T> {
    // == Into Shared ==
    /// Converts the typed entry into the namespace representation,
    /// preserving its timestamps.
    pub fn into_shared(self) -> Result<CacheEntry<Value>> {
        Ok(CacheEntry {
            data: serde_json::to_value(self.data)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

impl<T: DeserializeOwned> CacheEntry<T> {
    // == From Shared ==
    /// Recovers a typed entry from the namespace representation,
    /// preserving its timestamps.
    pub fn from_shared(entry: CacheEntry<Value>) -> Result<Self> {
        Ok(Self {
            data: serde_json::from_value(entry.data)?,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
