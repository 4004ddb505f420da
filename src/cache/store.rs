//! Cache Store Module
//!
//! Typed per-key cache handle over a shared namespace and an optional
//! durable tier. A handle owns one key, one fetch function and one
//! published state stream; several handles over the same namespace share
//! entries, last write wins.
//!
//! The lifecycle mirrors a UI consumer: construct, [`load`](CacheStore::load)
//! once, then read [`state`](CacheStore::state) or call
//! [`get`](CacheStore::get)/[`set`](CacheStore::set)/
//! [`refresh`](CacheStore::refresh)/[`invalidate`](CacheStore::invalidate).
//! Dropping the handle cancels state publication without cancelling an
//! in-flight background fetch, which still completes into the shared
//! namespace for other consumers.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, SharedNamespace};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::{BestEffortStore, DurableStore, CACHE_KEY_PREFIX};

// == Fetch Function ==
/// Zero-argument fetch operation supplied by the consumer; failures are
/// opaque to the cache.
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

// == Cache State ==
/// State published to the consumer of a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheState<T> {
    /// Most recently published value, possibly stale
    pub data: Option<T>,
    /// True while a fetch is pending for this handle
    pub is_loading: bool,
    /// True when `data` is being served past its TTL (or was invalidated)
    pub is_stale: bool,
    /// Last fetch error; cleared by the next successful fetch or set
    pub error: Option<Arc<CacheError>>,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: true,
            is_stale: false,
            error: None,
        }
    }
}

// == Cache Store ==
/// Typed cache handle bound to a single key.
pub struct CacheStore<T> {
    key: String,
    storage_key: String,
    config: Config,
    namespace: SharedNamespace,
    storage: Option<BestEffortStore>,
    fetch: FetchFn<T>,
    state_tx: watch::Sender<CacheState<T>>,
    /// Held so the channel stays open for the handle's own state reads
    state_rx: watch::Receiver<CacheState<T>>,
    cancel: CancellationToken,
}

impl<T> CacheStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a handle for `key` over a shared namespace.
    ///
    /// `fetch` is invoked on misses, refreshes and revalidations. The handle
    /// starts in a loading state; call [`load`](Self::load) to run the
    /// mount protocol.
    pub fn new<F, Fut>(
        namespace: SharedNamespace,
        key: impl Into<String>,
        config: Config,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let key = key.into();
        let (state_tx, state_rx) = watch::channel(CacheState::default());
        Self {
            storage_key: format!("{CACHE_KEY_PREFIX}{key}"),
            key,
            config,
            namespace,
            storage: None,
            fetch: Arc::new(move || Box::pin(fetch()) as BoxFuture<'static, anyhow::Result<T>>),
            state_tx,
            state_rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a durable tier; entries are mirrored under
    /// `"cache:" + key` unless overridden with
    /// [`with_storage_key`](Self::with_storage_key).
    pub fn with_storage(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.storage = Some(BestEffortStore::new(store));
        self.config.persist = true;
        self
    }

    /// Attaches an already-wrapped best-effort store (e.g. one carrying a
    /// storage failure hook).
    pub fn with_best_effort_storage(mut self, store: BestEffortStore) -> Self {
        self.storage = Some(store);
        self.config.persist = true;
        self
    }

    /// Overrides the durable-tier key.
    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    // == State ==
    /// Returns the current published state.
    pub fn state(&self) -> CacheState<T> {
        self.state_rx.borrow().clone()
    }

    /// Subscribes to published state changes.
    pub fn subscribe(&self) -> watch::Receiver<CacheState<T>> {
        self.state_tx.subscribe()
    }

    /// The key this handle is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    // == Load ==
    /// Runs the load-on-mount protocol once:
    ///
    /// 1. Memory hit: publish immediately; if expired and
    ///    stale-while-revalidate is enabled, publish as stale and
    ///    revalidate in the background.
    /// 2. Memory miss: check the durable tier; on a hit, seed memory,
    ///    publish, and apply the same expired branch.
    /// 3. Both miss: unconditional fetch-and-populate.
    pub async fn load(&self) -> Result<()> {
        // 1. Memory tier
        let from_memory = self.namespace.write().await.get(&self.key);
        if let Some(shared) = from_memory {
            if self.publish_entry(shared) {
                return Ok(());
            }
            return self.refresh().await.map(|_| ());
        }

        // 2. Durable tier
        if let Some(raw) = self.storage_get().await {
            match serde_json::from_str::<CacheEntry<Value>>(&raw) {
                Ok(shared) => {
                    // Seed memory so other consumers see the durable entry
                    self.namespace.write().await.insert(&self.key, shared.clone())?;
                    if self.publish_entry(shared) {
                        return Ok(());
                    }
                    return self.refresh().await.map(|_| ());
                }
                Err(error) => {
                    warn!(key = %self.key, %error, "discarding undecodable durable entry");
                    self.storage_remove().await;
                }
            }
        }

        // 3. Unconditional fetch-and-populate
        self.refresh().await.map(|_| ())
    }

    /// Publishes a namespace entry to the consumer. Returns false when the
    /// caller should fall through to a foreground fetch instead.
    fn publish_entry(&self, shared: CacheEntry<Value>) -> bool {
        let expired = shared.is_expired();
        let entry: CacheEntry<T> = match CacheEntry::from_shared(shared) {
            Ok(entry) => entry,
            Err(error) => {
                // Another consumer stored a differently-shaped value under
                // this key; treat as a miss
                warn!(key = %self.key, %error, "namespace entry has incompatible shape");
                return false;
            }
        };

        if !expired {
            self.publish(CacheState {
                data: Some(entry.data),
                is_loading: false,
                is_stale: false,
                error: None,
            });
            return true;
        }

        if self.config.stale_while_revalidate {
            self.publish(CacheState {
                data: Some(entry.data),
                is_loading: false,
                is_stale: true,
                error: None,
            });
            self.spawn_revalidation();
            return true;
        }

        false
    }

    // == Get ==
    /// Returns the namespace value if present and unexpired, otherwise the
    /// most recently published (possibly stale) value. Never fetches.
    pub async fn get(&self) -> Option<T> {
        let shared = self.namespace.write().await.get(&self.key);
        if let Some(shared) = shared {
            if !shared.is_expired() {
                if let Ok(entry) = CacheEntry::<T>::from_shared(shared) {
                    return Some(entry.data);
                }
            }
        }
        self.state_rx.borrow().data.clone()
    }

    // == Set ==
    /// Unconditionally overwrites both tiers with a freshly timestamped
    /// entry and clears staleness. Durable-write failures are swallowed.
    pub async fn set(&self, value: T) -> Result<()> {
        self.store_value(value.clone()).await?;
        self.publish(CacheState {
            data: Some(value),
            is_loading: false,
            is_stale: false,
            error: None,
        });
        Ok(())
    }

    // == Invalidate ==
    /// Removes the entry from both tiers and publishes absent-and-stale.
    pub async fn invalidate(&self) {
        self.namespace.write().await.remove(&self.key);
        self.storage_remove().await;
        self.publish(CacheState {
            data: None,
            is_loading: false,
            is_stale: true,
            error: None,
        });
    }

    // == Refresh ==
    /// Forces an unconditional re-fetch and republishes into both tiers.
    ///
    /// Rapid repeated calls run independent fetches; the last completion
    /// wins, consistent with the namespace's last-write-wins rule.
    ///
    /// A failed fetch leaves previously published data untouched and
    /// surfaces the error both in the returned Result and the state's
    /// error field.
    pub async fn refresh(&self) -> Result<T> {
        let mut loading = self.state_rx.borrow().clone();
        loading.is_loading = true;
        self.publish(loading);

        self.namespace.write().await.record_revalidation();

        match (self.fetch)().await {
            Ok(value) => {
                self.store_value(value.clone()).await?;
                self.publish(CacheState {
                    data: Some(value.clone()),
                    is_loading: false,
                    is_stale: false,
                    error: None,
                });
                Ok(value)
            }
            Err(source) => {
                let message = source.to_string();
                let error = CacheError::fetch(&self.key, source);
                debug!(key = %self.key, %error, "fetch failed; keeping prior data");
                let mut state = self.state_rx.borrow().clone();
                state.is_loading = false;
                state.error = Some(Arc::new(CacheError::fetch(
                    &self.key,
                    anyhow::anyhow!(message),
                )));
                self.publish(state);
                Err(error)
            }
        }
    }

    // == Detach ==
    /// Stops state publication for this handle. Background fetches already
    /// in flight still complete into the shared namespace.
    pub fn detach(&self) {
        self.cancel.cancel();
    }

    // == Internals ==
    /// Writes a value into the namespace and, when enabled, the durable tier.
    async fn store_value(&self, value: T) -> Result<()> {
        let shared = CacheEntry::new(value, self.config.ttl).into_shared()?;
        self.namespace.write().await.insert(&self.key, shared.clone())?;
        self.storage_set(&shared).await;
        Ok(())
    }

    /// Best-effort durable read; swallowed failures are counted.
    async fn storage_get(&self) -> Option<String> {
        let storage = self.storage.as_ref()?;
        let (value, swallowed) = storage.get(&self.storage_key).await;
        if swallowed {
            self.namespace.write().await.record_storage_failure();
        }
        value
    }

    /// Best-effort durable write; swallowed failures are counted.
    async fn storage_set(&self, shared: &CacheEntry<Value>) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        match serde_json::to_string(shared) {
            Ok(raw) => {
                if storage.set(&self.storage_key, &raw).await {
                    self.namespace.write().await.record_storage_failure();
                }
            }
            Err(error) => {
                warn!(key = %self.key, %error, "could not serialize entry for durable tier");
            }
        }
    }

    /// Best-effort durable removal; swallowed failures are counted.
    async fn storage_remove(&self) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        if storage.remove(&self.storage_key).await {
            self.namespace.write().await.record_storage_failure();
        }
    }

    /// Publishes state unless the handle has been detached.
    fn publish(&self, state: CacheState<T>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.state_tx.send(state);
    }

    /// Spawns a background revalidation. The fetch populates the shared
    /// tiers even if the handle is detached mid-flight; only publication to
    /// this handle's state is suppressed.
    fn spawn_revalidation(&self) {
        let fetch = self.fetch.clone();
        let namespace = self.namespace.clone();
        let storage = self.storage.clone();
        let key = self.key.clone();
        let storage_key = self.storage_key.clone();
        let ttl = self.config.ttl;
        let state_tx = self.state_tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            namespace.write().await.record_revalidation();

            match fetch().await {
                Ok(value) => {
                    let shared = match CacheEntry::new(value.clone(), ttl).into_shared() {
                        Ok(shared) => shared,
                        Err(error) => {
                            warn!(%key, %error, "could not serialize revalidated value");
                            return;
                        }
                    };

                    if let Err(error) = namespace.write().await.insert(&key, shared.clone()) {
                        warn!(%key, %error, "could not store revalidated value");
                        return;
                    }

                    if let Some(storage) = &storage {
                        match serde_json::to_string(&shared) {
                            Ok(raw) => {
                                if storage.set(&storage_key, &raw).await {
                                    namespace.write().await.record_storage_failure();
                                }
                            }
                            Err(error) => {
                                warn!(%key, %error, "could not serialize entry for durable tier");
                            }
                        }
                    }

                    if !cancel.is_cancelled() {
                        let _ = state_tx.send(CacheState {
                            data: Some(value),
                            is_loading: false,
                            is_stale: false,
                            error: None,
                        });
                    }
                }
                Err(source) => {
                    let error = Arc::new(CacheError::fetch(&key, source));
                    debug!(%key, %error, "revalidation failed; keeping stale data");
                    if !cancel.is_cancelled() {
                        let mut state = state_tx.borrow().clone();
                        state.is_loading = false;
                        state.error = Some(error);
                        let _ = state_tx.send(state);
                    }
                }
            }
        });
    }
}

impl<T> Drop for CacheStore<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T> std::fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("key", &self.key)
            .field("storage_key", &self.storage_key)
            .field("persist", &self.config.persist)
            .finish()
    }
}
