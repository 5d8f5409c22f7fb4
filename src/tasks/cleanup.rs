//! Expired Entry Sweeper
//!
//! Background task that periodically drops expired values from the in-process store.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedStore;

/// Spawns a task that sweeps expired entries every `check_period_secs` seconds.
///
/// Reads already ignore expired values, so the sweep only reclaims memory.
///
/// # Returns
/// A JoinHandle to abort during shutdown.
///
/// # Example
/// ```ignore
/// let provider = MemoryCacheProvider::new(1000, 300, KeyPrefix::default());
/// let handle = spawn_cleanup_task(provider.store(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(store: SharedStore, check_period_secs: u64) -> JoinHandle<()> {
    let period = Duration::from_secs(check_period_secs.max(1));

    tokio::spawn(async move {
        info!(check_period_secs, "memory cache cleanup task started");

        loop {
            tokio::time::sleep(period).await;

            let (removed, stats) = {
                let mut guard = store.write().await;
                let removed = guard.cleanup_expired();
                (removed, guard.stats())
            };
            if removed > 0 {
                info!(
                    removed,
                    keys = stats.keys,
                    hit_rate = stats.hit_rate(),
                    "memory cache cleanup removed expired entries"
                );
            } else {
                debug!(
                    keys = stats.keys,
                    hit_rate = stats.hit_rate(),
                    "memory cache cleanup found nothing to remove"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn shared_store() -> SharedStore {
        Arc::new(RwLock::new(MemoryStore::new(100, 300)))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let store = shared_store();
        store
            .write()
            .await
            .set("expire_soon", json!("value"), Some(1))
            .unwrap();

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        {
            let guard = store.read().await;
            assert_eq!(guard.len(), 0, "Expired entry should have been swept");
            assert_eq!(guard.stats().expirations, 1);
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let store = shared_store();
        store
            .write()
            .await
            .set("long_lived", json!("value"), Some(3600))
            .unwrap();

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.write().await.get("long_lived"), Some(json!("value")));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(shared_store(), 1);

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
