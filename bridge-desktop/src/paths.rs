//! Conventional on-disk locations for desktop hosts

use bridge_traits::error::{BridgeError, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "collection-sync";

/// Where the desktop adapters keep their files.
///
/// Everything lives under one root: the collection database, the settings
/// database and the `backups/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopPaths {
    root: PathBuf,
}

impl DesktopPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use the platform data directory (e.g. `~/.local/share/collection-sync`).
    pub fn from_system() -> Result<Self> {
        dirs::data_dir()
            .map(|dir| Self::new(dir.join(APP_DIR)))
            .ok_or_else(|| {
                BridgeError::NotAvailable("No platform data directory available".to_string())
            })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_db(&self) -> PathBuf {
        self.root.join("collection.db")
    }

    pub fn settings_db(&self) -> PathBuf {
        self.root.join("settings.db")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backups")
    }
}
