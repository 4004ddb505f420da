//! TTL Cleanup Task
//!
//! Background task that periodically removes expired namespace entries.
//! Without it, expired entries linger until they are overwritten, evicted
//! or invalidated (reads deliberately keep them for stale serving).

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedNamespace;

/// Spawns a background task that periodically cleans up expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. It acquires a write lock on the namespace to remove
/// expired entries.
///
/// # Arguments
/// * `namespace` - Shared namespace to sweep
/// * `cleanup_interval` - Interval between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let namespace = CacheNamespace::shared(100);
/// let cleanup_handle = spawn_cleanup_task(namespace.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    namespace: SharedNamespace,
    cleanup_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?cleanup_interval, "starting TTL cleanup task");

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let removed = {
                let mut namespace = namespace.write().await;
                namespace.cleanup_expired()
            };

            if removed > 0 {
                info!(removed, "TTL cleanup removed expired entries");
            } else {
                debug!("TTL cleanup found no expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheNamespace};
    use serde_json::Value;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let namespace = CacheNamespace::shared(100);

        {
            let mut ns = namespace.write().await;
            ns.insert(
                "expire_soon",
                CacheEntry::new(Value::String("value".into()), Duration::from_millis(50)),
            )
            .unwrap();
        }

        let handle = spawn_cleanup_task(namespace.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(!namespace.read().await.contains("expire_soon"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let namespace = CacheNamespace::shared(100);

        {
            let mut ns = namespace.write().await;
            ns.insert(
                "long_lived",
                CacheEntry::new(Value::String("value".into()), Duration::from_secs(3600)),
            )
            .unwrap();
        }

        let handle = spawn_cleanup_task(namespace.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(namespace.read().await.contains("long_lived"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let namespace = CacheNamespace::shared(100);

        let handle = spawn_cleanup_task(namespace, Duration::from_millis(100));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
