//! File Store Module
//!
//! Durable-store backend persisting all entries into a single JSON file.
//! Writes go through a temp-file-then-rename sequence so a crash mid-write
//! never leaves a truncated store behind.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::storage::DurableStore;

// == Json File Store ==
/// Single-file JSON durable-store backend.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Entries mirrored in memory; the file is the source of truth on open
    entries: Mutex<Option<HashMap<String, String>>>,
}

impl JsonFileStore {
    // == Constructor ==
    /// Creates a store backed by the given file path.
    ///
    /// The file is read lazily on first access; a missing file is an empty
    /// store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    /// Loads the backing file into the in-memory mirror if not yet loaded.
    async fn load<'a>(
        &self,
        guard: &'a mut Option<HashMap<String, String>>,
    ) -> anyhow::Result<&'a mut HashMap<String, String>> {
        if guard.is_none() {
            let entries = match tokio::fs::read(&self.path).await {
                Ok(bytes) => serde_json::from_slice(&bytes)
                    .with_context(|| format!("corrupt store file {}", self.path.display()))?,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("reading store file {}", self.path.display()))
                }
            };
            *guard = Some(entries);
        }
        Ok(guard.as_mut().expect("just loaded"))
    }

    /// Persists the in-memory mirror: write a sibling temp file, then rename
    /// it over the target path.
    async fn persist(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(entries).context("serializing store file")?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing temp store file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing store file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut guard = self.entries.lock().await;
        let entries = self.load(&mut guard).await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut guard = self.entries.lock().await;
        let entries = self.load(&mut guard).await?;
        entries.insert(key.to_string(), value.to_string());
        let snapshot = entries.clone();
        self.persist(&snapshot).await
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut guard = self.entries.lock().await;
        let entries = self.load(&mut guard).await?;
        if entries.remove(key).is_some() {
            let snapshot = entries.clone();
            self.persist(&snapshot).await?;
        }
        Ok(())
    }

    async fn list_keys(&self) -> anyhow::Result<Vec<String>> {
        let mut guard = self.entries.lock().await;
        let entries = self.load(&mut guard).await?;
        Ok(entries.keys().cloned().collect())
    }

    async fn remove_many(&self, keys: &[String]) -> anyhow::Result<()> {
        let mut guard = self.entries.lock().await;
        let entries = self.load(&mut guard).await?;
        let mut changed = false;
        for key in keys {
            changed |= entries.remove(key).is_some();
        }
        if changed {
            let snapshot = entries.clone();
            self.persist(&snapshot).await?;
        }
        Ok(())
    }
}
