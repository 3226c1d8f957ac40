//! Scoped close/reopen of the collection around a full transfer.

use crate::{Result, SyncError};
use bridge_traits::{CloseOptions, CollectionStore};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Holds the collection closed for a full transfer.
///
/// Call [`CollectionGuard::release`] to reopen it. If the guard is dropped
/// without being released (the session future was dropped mid-transfer),
/// the reopen is spawned onto the current runtime instead.
pub struct CollectionGuard {
    collection: Arc<dyn CollectionStore>,
    released: bool,
}

impl CollectionGuard {
    /// Close the collection, persisting pending writes.
    ///
    /// If closing fails the collection is reopened before the error is
    /// returned.
    pub async fn close_for_full_sync(collection: Arc<dyn CollectionStore>) -> Result<Self> {
        let guard = Self {
            collection,
            released: false,
        };

        let closed = guard.collection.close(CloseOptions::for_full_sync()).await;
        if let Err(err) = closed {
            error!(error = %err, "Failed to close collection for full sync");
            if let Err(reopen_err) = guard.reopen(false).await {
                warn!(error = %reopen_err, "Reopen after failed close also failed");
            }
            return Err(SyncError::Collection(err));
        }

        debug!("Collection closed for full sync");
        Ok(guard)
    }

    /// Reopen the collection in post-full-sync mode.
    pub async fn release(self) -> Result<()> {
        self.reopen(true).await?;
        debug!("Collection reopened after full sync");
        Ok(())
    }

    /// The guard only counts as released once the reopen has returned. If
    /// this future is dropped mid-reopen, `Drop` spawns another one.
    async fn reopen(mut self, after_full_sync: bool) -> Result<()> {
        let reopened = self.collection.reopen(after_full_sync).await;
        self.released = true;
        reopened.map_err(SyncError::Collection)
    }
}

impl Drop for CollectionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let collection = Arc::clone(&self.collection);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Collection guard dropped while closed; reopening in background");
                handle.spawn(async move {
                    if let Err(err) = collection.reopen(true).await {
                        error!(error = %err, "Background reopen of collection failed");
                    }
                });
            }
            Err(_) => {
                error!("No async runtime available; collection left closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BackupOptions, BridgeError};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FlagCollection {
        open: AtomicBool,
        reopens: AtomicUsize,
        reopen_modes: StdMutex<Vec<bool>>,
        fail_close: bool,
        /// Delay applied to the first reopen only.
        first_reopen_delay: Option<Duration>,
    }

    #[async_trait]
    impl CollectionStore for FlagCollection {
        async fn close(&self, _options: CloseOptions) -> BridgeResult<()> {
            if self.fail_close {
                return Err(BridgeError::DatabaseError("locked".into()));
            }
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn reopen(&self, after_full_sync: bool) -> BridgeResult<()> {
            let attempt = self.reopens.fetch_add(1, Ordering::SeqCst);
            self.reopen_modes.lock().unwrap().push(after_full_sync);
            if let (0, Some(delay)) = (attempt, self.first_reopen_delay) {
                tokio::time::sleep(delay).await;
            }
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn create_backup(
            &self,
            _backup_dir: &Path,
            _options: BackupOptions,
        ) -> BridgeResult<Option<PathBuf>> {
            Ok(None)
        }

        async fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }
    }

    fn open_collection(fail_close: bool) -> Arc<FlagCollection> {
        Arc::new(FlagCollection {
            open: AtomicBool::new(true),
            fail_close,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_release_reopens() {
        let collection = open_collection(false);
        let guard = CollectionGuard::close_for_full_sync(collection.clone())
            .await
            .unwrap();
        assert!(!collection.is_open().await);

        guard.release().await.unwrap();
        assert!(collection.is_open().await);
        assert_eq!(collection.reopens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_reopens_in_background() {
        let collection = open_collection(false);
        let guard = CollectionGuard::close_for_full_sync(collection.clone())
            .await
            .unwrap();
        drop(guard);

        for _ in 0..50 {
            if collection.is_open().await {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(collection.is_open().await);
    }

    #[tokio::test]
    async fn test_failed_close_still_reopens() {
        let collection = open_collection(true);
        let result = CollectionGuard::close_for_full_sync(collection.clone()).await;
        assert!(matches!(result, Err(SyncError::Collection(_))));
        assert_eq!(collection.reopens.load(Ordering::SeqCst), 1);
        assert_eq!(*collection.reopen_modes.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn test_release_uses_post_full_sync_mode() {
        let collection = open_collection(false);
        let guard = CollectionGuard::close_for_full_sync(collection.clone())
            .await
            .unwrap();
        guard.release().await.unwrap();
        assert_eq!(*collection.reopen_modes.lock().unwrap(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_release_still_reopens() {
        let collection = Arc::new(FlagCollection {
            open: AtomicBool::new(true),
            first_reopen_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let guard = CollectionGuard::close_for_full_sync(collection.clone())
            .await
            .unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), guard.release()).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(collection.is_open().await);
        assert_eq!(collection.reopens.load(Ordering::SeqCst), 2);
    }
}
