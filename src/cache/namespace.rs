//! Cache Namespace Module
//!
//! Bounded, shared key-value engine combining HashMap storage with FIFO
//! insertion-order tracking and TTL bookkeeping. All [`CacheStore`] handles
//! constructed over the same namespace observe the same entries.
//!
//! The namespace is an explicitly constructed object injected into its
//! consumers; writes follow last-write-wins with no locking discipline
//! beyond the surrounding `RwLock`.
//!
//! [`CacheStore`]: crate::cache::CacheStore

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, FifoTracker, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

/// Shared handle to a namespace, cloned into every consumer.
pub type SharedNamespace = Arc<RwLock<CacheNamespace>>;

// == Cache Namespace ==
/// Process-scoped cache storage with FIFO eviction and TTL support.
#[derive(Debug)]
pub struct CacheNamespace {
    /// Key-value storage; values are type-erased for cross-consumer sharing
    entries: HashMap<String, CacheEntry<Value>>,
    /// Insertion-order tracker
    fifo: FifoTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheNamespace {
    // == Constructor ==
    /// Creates a new CacheNamespace with the specified capacity.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            fifo: FifoTracker::new(),
            stats: CacheStats::new(),
            max_entries,
        }
    }

    /// Creates a namespace already wrapped for sharing across consumers.
    pub fn shared(max_entries: usize) -> SharedNamespace {
        Arc::new(RwLock::new(Self::new(max_entries)))
    }

    // == Insert ==
    /// Stores an entry under a key.
    ///
    /// If the key already exists, the entry is overwritten in place and
    /// keeps its original position in the eviction order. If the namespace
    /// is at capacity, the earliest-inserted entry is evicted first.
    pub fn insert(&mut self, key: &str, entry: CacheEntry<Value>) -> Result<()> {
        validate_key(key)?;

        let is_overwrite = self.entries.contains_key(key);

        // If not overwriting and at capacity, evict earliest-inserted entry
        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.fifo.evict_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
                debug!(key = %evicted_key, "evicted earliest-inserted entry");
            }
        }

        self.entries.insert(key.to_string(), entry);
        self.fifo.record(key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves the entry for a key, expired or not.
    ///
    /// Expired entries are returned rather than dropped so that callers can
    /// serve them while revalidating; removal happens through
    /// [`remove`](Self::remove), eviction or [`cleanup_expired`](Self::cleanup_expired).
    /// Hit/stale/miss accounting happens here.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry<Value>> {
        match self.entries.get(key) {
            Some(entry) => {
                if entry.is_expired() {
                    self.stats.record_stale_serve();
                } else {
                    self.stats.record_hit();
                }
                Some(entry.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Peek ==
    /// Returns the entry for a key without touching the statistics.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<Value>> {
        self.entries.get(key)
    }

    // == Remove ==
    /// Removes an entry by key. Returns true if an entry was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.fifo.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Clear ==
    /// Drops every entry in the namespace.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.fifo = FifoTracker::new();
        self.stats.set_total_entries(0);
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the namespace.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
            self.fifo.remove(&key);
        }

        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Stats ==
    /// Returns current namespace statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Records a revalidation fetch triggered by a consumer.
    pub fn record_revalidation(&mut self) {
        self.stats.record_revalidation();
    }

    /// Records a durable-storage failure swallowed by a consumer.
    pub fn record_storage_failure(&mut self) {
        self.stats.record_storage_failure();
    }

    // == Contains ==
    /// Checks whether a key is present (expired or not).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the namespace is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Key Validation ==
/// Rejects empty keys and keys over the length limit.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
