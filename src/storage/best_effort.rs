//! Best-Effort Store Module
//!
//! Fail-soft wrapper around any [`DurableStore`]. Backend failures never
//! propagate: reads degrade to "not found", writes and removals to no-ops.
//! Every swallowed failure is logged at `warn` and forwarded to an optional
//! injected hook so a persistently failing backend stays detectable.

use std::sync::Arc;

use tracing::warn;

use crate::error::CacheError;
use crate::storage::DurableStore;

// == Storage Error Hook ==
/// Callback invoked with every swallowed storage failure.
pub type StorageErrorHook = Arc<dyn Fn(&CacheError) + Send + Sync>;

// == Best-Effort Store ==
/// Wraps a [`DurableStore`] with the fail-soft contract.
#[derive(Clone)]
pub struct BestEffortStore {
    inner: Arc<dyn DurableStore>,
    hook: Option<StorageErrorHook>,
}

impl BestEffortStore {
    // == Constructor ==
    /// Wraps a store with failures swallowed and logged.
    pub fn new(inner: Arc<dyn DurableStore>) -> Self {
        Self { inner, hook: None }
    }

    /// Wraps a store, additionally forwarding swallowed failures to `hook`.
    pub fn with_hook(inner: Arc<dyn DurableStore>, hook: StorageErrorHook) -> Self {
        Self {
            inner,
            hook: Some(hook),
        }
    }

    fn swallow(&self, operation: &'static str, key: &str, source: anyhow::Error) {
        let error = CacheError::storage(operation, key, source);
        warn!(%error, "durable storage failure swallowed");
        if let Some(hook) = &self.hook {
            hook(&error);
        }
    }

    // == Get ==
    /// Reads a value; a backend failure is reported as absent.
    ///
    /// The boolean in the result is true when a failure was swallowed, so
    /// callers can keep their own counters.
    pub async fn get(&self, key: &str) -> (Option<String>, bool) {
        match self.inner.get(key).await {
            Ok(value) => (value, false),
            Err(source) => {
                self.swallow("get", key, source);
                (None, true)
            }
        }
    }

    // == Set ==
    /// Writes a value; a backend failure is a no-op. Returns true when a
    /// failure was swallowed.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        match self.inner.set(key, value).await {
            Ok(()) => false,
            Err(source) => {
                self.swallow("set", key, source);
                true
            }
        }
    }

    // == Remove ==
    /// Removes a value; a backend failure is a no-op. Returns true when a
    /// failure was swallowed.
    pub async fn remove(&self, key: &str) -> bool {
        match self.inner.remove(key).await {
            Ok(()) => false,
            Err(source) => {
                self.swallow("remove", key, source);
                true
            }
        }
    }
}

impl std::fmt::Debug for BestEffortStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestEffortStore")
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}
