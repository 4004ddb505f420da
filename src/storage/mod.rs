//! Storage Module
//!
//! Durable key-value tier behind the in-memory namespace. Access is
//! best-effort: consumers go through [`BestEffortStore`], which swallows
//! backend failures so persistence stays an optimization rather than a
//! correctness requirement.

mod best_effort;
mod file;
mod memory;

use async_trait::async_trait;

// Re-export public types
pub use best_effort::{BestEffortStore, StorageErrorHook};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

// == Public Constants ==
/// Key prefix for entries written by keyed cache stores
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// Key prefix for entries written by query caches
pub const QUERY_KEY_PREFIX: &str = "query:";

// == Durable Store Trait ==
/// Asynchronous durable key-value store.
///
/// Every operation may fail; callers in this crate reach implementations
/// only through [`BestEffortStore`], which maps read failures to "not
/// found" and write failures to no-ops.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns the stored value for a key, or None if absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores a value under a key, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removes the value for a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> anyhow::Result<()>;

    /// Lists every key currently stored.
    async fn list_keys(&self) -> anyhow::Result<Vec<String>>;

    /// Removes all of the given keys.
    async fn remove_many(&self, keys: &[String]) -> anyhow::Result<()>;
}

// == Clear Stored Cache ==
/// Removes every durable entry whose key starts with `prefix`.
///
/// Enumerates the store's keys, filters by prefix, and bulk-removes the
/// matches. Returns the number of keys removed.
pub async fn clear_stored_cache(store: &dyn DurableStore, prefix: &str) -> anyhow::Result<usize> {
    let keys: Vec<String> = store
        .list_keys()
        .await?
        .into_iter()
        .filter(|k| k.starts_with(prefix))
        .collect();

    if keys.is_empty() {
        return Ok(0);
    }

    store.remove_many(&keys).await?;
    Ok(keys.len())
}
