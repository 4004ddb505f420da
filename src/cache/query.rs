//! Query Cache Module
//!
//! Parameter-keyed cache variant. Where [`CacheStore`] binds one handle to
//! one caller-supplied string key, a [`QueryCache`] derives keys from the
//! query parameters themselves and owns its entries for the lifetime of the
//! instance instead of sharing a process-wide namespace.
//!
//! [`CacheStore`]: crate::cache::CacheStore

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::CacheEntry;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::{BestEffortStore, DurableStore, QUERY_KEY_PREFIX};

// == Query Function ==
/// Fetch operation taking the query parameters; failures are opaque.
pub type QueryFn<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

// == Query Cache ==
/// Instance-scoped cache keyed by query parameters.
pub struct QueryCache<P, T> {
    query: QueryFn<P, T>,
    config: Config,
    storage: Option<BestEffortStore>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    _params: PhantomData<fn(P)>,
}

impl<P, T> QueryCache<P, T>
where
    P: Serialize + Send + 'static,
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a query cache around a query function.
    pub fn new<F, Fut>(config: Config, query: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            query: Arc::new(move |params| {
                Box::pin(query(params)) as BoxFuture<'static, anyhow::Result<T>>
            }),
            config,
            storage: None,
            entries: Mutex::new(HashMap::new()),
            _params: PhantomData,
        }
    }

    /// Attaches a durable tier; entries are mirrored under `"query:"`-prefixed
    /// derived keys.
    pub fn with_storage(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.storage = Some(BestEffortStore::new(store));
        self.config.persist = true;
        self
    }

    // == Key Derivation ==
    /// Derives the cache key from the parameters.
    ///
    /// Parameters are canonicalized through `serde_json::Value`, whose
    /// object representation sorts keys, so structurally equal parameters
    /// always yield identical keys.
    pub fn derive_key(params: &P) -> Result<String> {
        let value = serde_json::to_value(params)?;
        Ok(serde_json::to_string(&value)?)
    }

    fn storage_key(key: &str) -> String {
        format!("{QUERY_KEY_PREFIX}{key}")
    }

    // == Get ==
    /// Returns the cached value for the parameters if present and
    /// unexpired. Never fetches.
    pub async fn get(&self, params: &P) -> Result<Option<T>> {
        let key = Self::derive_key(params)?;
        let entries = self.entries.lock().await;
        Ok(entries
            .get(&key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone()))
    }

    // == Set ==
    /// Stores a value for the parameters with a fresh timestamp.
    pub async fn set(&self, data: T, params: &P) -> Result<()> {
        let key = Self::derive_key(params)?;
        let entry = CacheEntry::new(data, self.config.ttl);
        self.storage_set(&key, &entry).await;
        self.entries.lock().await.insert(key, entry);
        Ok(())
    }

    // == Fetch ==
    /// Returns the cached value if fresh, otherwise runs the query function
    /// and populates the cache with its result.
    pub async fn fetch(&self, params: P) -> Result<T> {
        if let Some(data) = self.get(&params).await? {
            return Ok(data);
        }

        let key = Self::derive_key(&params)?;
        let data = (self.query)(params)
            .await
            .map_err(|source| CacheError::fetch(&key, source))?;

        let entry = CacheEntry::new(data.clone(), self.config.ttl);
        self.storage_set(&key, &entry).await;
        self.entries.lock().await.insert(key, entry);
        Ok(data)
    }

    // == Prefetch ==
    /// Runs the query function and populates the cache without returning
    /// the value; side effect only.
    pub async fn prefetch(&self, params: P) -> Result<()> {
        let key = Self::derive_key(&params)?;
        let data = (self.query)(params)
            .await
            .map_err(|source| CacheError::fetch(&key, source))?;

        let entry = CacheEntry::new(data, self.config.ttl);
        self.storage_set(&key, &entry).await;
        self.entries.lock().await.insert(key.clone(), entry);
        debug!(%key, "prefetched query result");
        Ok(())
    }

    // == Invalidate ==
    /// Removes the entry for the parameters from both tiers.
    pub async fn invalidate(&self, params: &P) -> Result<()> {
        let key = Self::derive_key(params)?;
        self.entries.lock().await.remove(&key);
        if let Some(storage) = &self.storage {
            storage.remove(&Self::storage_key(&key)).await;
        }
        Ok(())
    }

    // == Invalidate All ==
    /// Drops every entry owned by this instance, from both tiers.
    pub async fn invalidate_all(&self) {
        let keys: Vec<String> = {
            let mut entries = self.entries.lock().await;
            let keys = entries.keys().cloned().collect();
            entries.clear();
            keys
        };

        if let Some(storage) = &self.storage {
            for key in keys {
                storage.remove(&Self::storage_key(&key)).await;
            }
        }
    }

    // == Length ==
    /// Returns the number of cached entries (expired included).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    // == Internals ==
    /// Best-effort durable write of a typed entry.
    async fn storage_set(&self, key: &str, entry: &CacheEntry<T>) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        match serde_json::to_string(entry) {
            Ok(raw) => {
                storage.set(&Self::storage_key(key), &raw).await;
            }
            Err(error) => {
                debug!(%key, %error, "could not serialize query entry for durable tier");
            }
        }
    }
}

impl<P, T> std::fmt::Debug for QueryCache<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("persist", &self.config.persist)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct SearchParams {
        term: String,
        page: u32,
    }

    fn params(term: &str, page: u32) -> SearchParams {
        SearchParams {
            term: term.to_string(),
            page,
        }
    }

    fn counting_query(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(SearchParams) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync + 'static
    {
        move |p: SearchParams| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(format!("{}-{}", p.term, p.page)) })
        }
    }

    fn test_config(ttl: Duration) -> Config {
        Config::default().with_ttl(ttl)
    }

    #[test]
    fn test_derive_key_is_structural() {
        let a = QueryCache::<SearchParams, String>::derive_key(&params("aspirin", 1)).unwrap();
        let b = QueryCache::<SearchParams, String>::derive_key(&params("aspirin", 1)).unwrap();
        let c = QueryCache::<SearchParams, String>::derive_key(&params("aspirin", 2)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_fetch_caches_by_params() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = QueryCache::new(
            test_config(Duration::from_secs(300)),
            counting_query(calls.clone()),
        );

        let first = cache.fetch(params("aspirin", 1)).await.unwrap();
        let second = cache.fetch(params("aspirin", 1)).await.unwrap();

        assert_eq!(first, "aspirin-1");
        assert_eq!(second, "aspirin-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Different params miss and fetch again
        cache.fetch(params("aspirin", 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = QueryCache::new(
            test_config(Duration::from_secs(300)),
            counting_query(Arc::new(AtomicUsize::new(0))),
        );

        cache
            .set("manual".to_string(), &params("aspirin", 1))
            .await
            .unwrap();

        let got = cache.get(&params("aspirin", 1)).await.unwrap();
        assert_eq!(got.as_deref(), Some("manual"));
    }

    #[tokio::test]
    async fn test_get_expired_is_none() {
        let cache = QueryCache::new(
            test_config(Duration::from_millis(30)),
            counting_query(Arc::new(AtomicUsize::new(0))),
        );

        cache
            .set("value".to_string(), &params("aspirin", 1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get(&params("aspirin", 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_single_entry() {
        let cache = QueryCache::new(
            test_config(Duration::from_secs(300)),
            counting_query(Arc::new(AtomicUsize::new(0))),
        );

        cache.set("a".to_string(), &params("aspirin", 1)).await.unwrap();
        cache.set("b".to_string(), &params("ibuprofen", 1)).await.unwrap();

        cache.invalidate(&params("aspirin", 1)).await.unwrap();

        assert!(cache.get(&params("aspirin", 1)).await.unwrap().is_none());
        assert!(cache.get(&params("ibuprofen", 1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_durable_tier() {
        let durable = Arc::new(MemoryStore::new());
        let cache = QueryCache::new(
            test_config(Duration::from_secs(300)),
            counting_query(Arc::new(AtomicUsize::new(0))),
        )
        .with_storage(durable.clone());

        cache.set("a".to_string(), &params("aspirin", 1)).await.unwrap();
        cache.set("b".to_string(), &params("ibuprofen", 1)).await.unwrap();
        assert_eq!(durable.len().await, 2);

        cache.invalidate_all().await;

        assert!(cache.is_empty().await);
        assert!(durable.is_empty().await);
    }

    #[tokio::test]
    async fn test_prefetch_populates_without_returning() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = QueryCache::new(
            test_config(Duration::from_secs(300)),
            counting_query(calls.clone()),
        );

        cache.prefetch(params("aspirin", 1)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Subsequent fetch is served from the cache
        let value = cache.fetch(params("aspirin", 1)).await.unwrap();
        assert_eq!(value, "aspirin-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_failure_surfaces_as_fetch_error() {
        let cache: QueryCache<SearchParams, String> =
            QueryCache::new(test_config(Duration::from_secs(300)), |_p: SearchParams| async {
                Err(anyhow::anyhow!("backend unavailable"))
            });

        let result = cache.fetch(params("aspirin", 1)).await;
        assert!(matches!(result, Err(CacheError::Fetch { .. })));
    }
}
