//! # Core Configuration Module
//!
//! Builder-based configuration for the collection sync core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds every bridge the core needs plus the handful of
//! settings that shape a sync session. The builder validates eagerly: a
//! missing bridge is reported as [`Error::CapabilityMissing`] with a message
//! saying how to provide it, rather than surfacing later as a runtime failure.
//!
//! ## Required Dependencies
//!
//! - `SyncBackend` - the remote sync protocol (always host-provided)
//! - `CollectionStore` - the local collection
//! - `SecureStore` - hkey persistence
//! - `SettingsStore` - username and endpoint persistence
//! - `backup_dir` - where full-download backups are written
//!
//! With the `desktop-shims` feature a keyring-backed `SecureStore` is injected
//! when none is given. The SQLite-backed stores need async setup and are
//! created by `core_service::bootstrap_desktop`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, MediaFailurePolicy};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .sync_backend(Arc::new(MyBackend::new()))
//!     .collection(Arc::new(collection))
//!     .secure_store(Arc::new(MySecureStore))
//!     .settings_store(Arc::new(settings))
//!     .backup_dir("/home/alice/.local/share/collection-sync/backups")
//!     .media_failure_policy(MediaFailurePolicy::FailSession)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{CollectionStore, SecureStore, SettingsStore, SyncBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// What a failed media sync does to an otherwise successful session.
///
/// Neither policy undoes the collection sync that already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFailurePolicy {
    /// Report the failure and finish the session successfully.
    #[default]
    Isolate,
    /// Fail the session with a media error.
    FailSession,
}

/// Feature flags controlling optional phases of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Run media sync after a completed collection sync.
    pub sync_media: bool,
    pub media_failure_policy: MediaFailurePolicy,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            sync_media: true,
            media_failure_policy: MediaFailurePolicy::default(),
        }
    }
}

/// Core configuration. Use [`CoreConfig::builder`] to construct.
#[derive(Clone)]
pub struct CoreConfig {
    pub sync_backend: Arc<dyn SyncBackend>,
    pub collection: Arc<dyn CollectionStore>,
    pub secure_store: Arc<dyn SecureStore>,
    pub settings_store: Arc<dyn SettingsStore>,
    /// Directory receiving the forced backup taken before a full download
    pub backup_dir: PathBuf,
    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("sync_backend", &"SyncBackend { ... }")
            .field("collection", &self.collection.path())
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("backup_dir", &self.backup_dir)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks values the type system cannot.
    pub fn validate(&self) -> Result<()> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(Error::Config("Backup directory cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn sync_backend_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SyncBackend".to_string(),
        message: "A SyncBackend implementation is required to talk to the sync server. \
                 Inject the host's backend with .sync_backend(); no default is shipped."
            .to_string(),
    }
}

fn collection_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "CollectionStore".to_string(),
        message: "A CollectionStore is required to close, reopen and back up the collection. \
                 Desktop: open a bridge_desktop::SqliteCollection or use core_service::bootstrap_desktop. \
                 Mobile: inject the platform collection handle."
            .to_string(),
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required to persist the login username and endpoint. \
                 Desktop: use bridge_desktop::SqliteSettingsStore or core_service::bootstrap_desktop. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required to persist the hkey. \
                 Desktop: enable the 'desktop-shims' feature to use the default KeyringSecureStore. \
                 Mobile: inject platform-native secure storage (Keychain/Keystore)."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Ok(store)
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    sync_backend: Option<Arc<dyn SyncBackend>>,
    collection: Option<Arc<dyn CollectionStore>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    backup_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the remote sync backend (required).
    pub fn sync_backend(mut self, backend: Arc<dyn SyncBackend>) -> Self {
        self.sync_backend = Some(backend);
        self
    }

    /// Sets the local collection handle (required).
    pub fn collection(mut self, collection: Arc<dyn CollectionStore>) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Sets the secure store holding the hkey.
    ///
    /// Defaults to the OS keyring when the `desktop-shims` feature is enabled.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the settings store holding username and endpoint (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the directory for pre-download backups (required).
    pub fn backup_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.backup_dir = Some(path.into());
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables the media sync phase. Default: enabled.
    pub fn sync_media(mut self, enabled: bool) -> Self {
        self.features.sync_media = enabled;
        self
    }

    /// Default: [`MediaFailurePolicy::Isolate`]
    pub fn media_failure_policy(mut self, policy: MediaFailurePolicy) -> Self {
        self.features.media_failure_policy = policy;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    /// - [`Error::Config`] when a value is missing or out of range
    pub fn build(self) -> Result<CoreConfig> {
        let sync_backend = self.sync_backend.ok_or_else(sync_backend_missing_error)?;
        let collection = self.collection.ok_or_else(collection_missing_error)?;
        let settings_store = self.settings_store.ok_or_else(settings_store_missing_error)?;

        let backup_dir = self.backup_dir.ok_or_else(|| {
            Error::Config("Backup directory is required. Use .backup_dir() to set it.".to_string())
        })?;

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let config = CoreConfig {
            sync_backend,
            collection,
            secure_store,
            settings_store,
            backup_dir,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}
