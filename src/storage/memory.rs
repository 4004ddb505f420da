//! In-Memory Store Module
//!
//! HashMap-backed durable-store implementation, used in tests and as a
//! stand-in backend when no real persistence is wired up. Supports failure
//! injection so the fail-soft contract of the storage boundary can be
//! exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::storage::DurableStore;

// == Memory Store ==
/// In-memory durable-store backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    /// When set, every operation fails
    failing: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new empty MemoryStore.
    pub fn new() -> Self {
        Self::default()
    }

    // == Failure Injection ==
    /// Makes every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(anyhow!("injected storage failure"))
        } else {
            Ok(())
        }
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.check()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.check()?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.check()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> anyhow::Result<Vec<String>> {
        self.check()?;
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn remove_many(&self, keys: &[String]) -> anyhow::Result<()> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}
