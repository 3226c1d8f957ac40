//! Local Collection Store Abstraction
//!
//! The collection is the local database being synced. Full transfers replace
//! the file wholesale, so the core must close it first and reopen it after.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// How a collection should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseOptions {
    /// Persist pending writes before closing.
    pub save: bool,
    /// Convert to the most compatible on-disk format.
    pub downgrade: bool,
    /// The file is about to be replaced by a full transfer.
    pub for_full_sync: bool,
}

impl CloseOptions {
    /// Options used right before a full upload or download.
    pub fn for_full_sync() -> Self {
        Self {
            save: true,
            downgrade: false,
            for_full_sync: true,
        }
    }
}

/// How a backup should be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackupOptions {
    /// Ignore the minimum interval between backups.
    pub force: bool,
    /// Return only once the backup file is complete.
    pub wait_for_completion: bool,
}

/// Exclusive handle to the local collection.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Close the collection. Closing an already closed collection is a no-op.
    async fn close(&self, options: CloseOptions) -> Result<()>;

    /// Reopen the collection. `after_full_sync` is set when the file was just
    /// replaced by a full transfer.
    async fn reopen(&self, after_full_sync: bool) -> Result<()>;

    /// Back the collection up into `backup_dir`.
    ///
    /// Returns the path of the new backup, or `None` when no backup was
    /// written (skipped, or still running in the background).
    async fn create_backup(
        &self,
        backup_dir: &Path,
        options: BackupOptions,
    ) -> Result<Option<PathBuf>>;

    /// Whether the collection is currently open.
    async fn is_open(&self) -> bool;

    /// Location of the collection file, if it has one.
    fn path(&self) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sync_close_options() {
        let options = CloseOptions::for_full_sync();
        assert!(options.save);
        assert!(!options.downgrade);
        assert!(options.for_full_sync);
        assert!(!BackupOptions::default().force);
    }
}
