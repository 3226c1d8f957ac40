//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (sync backend,
//! collection, secure storage, settings) into the sync core. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`]; other hosts build a
//! [`CoreConfig`] with their own bridges and call [`SyncService::new`].

pub mod error;

pub use error::{CoreError, Result};

pub use core_auth::{AuthToken, LoginState};
pub use core_runtime::config::{CoreConfig, FeatureFlags, MediaFailurePolicy};
pub use core_runtime::events::{CoreEvent, EventStream};
pub use core_sync::{
    ConflictResolution, MediaSyncStatus, SyncHandle, SyncPath, SyncSession, SyncSessionResult,
};
pub use tokio_util::sync::CancellationToken;

use core_auth::{CredentialStore, LoginManager};
use core_runtime::events::EventBus;
use core_sync::{SyncConfig, SyncCoordinator};
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::DesktopPaths;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct SyncService {
    config: CoreConfig,
    event_bus: EventBus,
    login: Arc<LoginManager>,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let credentials = CredentialStore::new(
            Arc::clone(&config.secure_store),
            Arc::clone(&config.settings_store),
        );
        let login = Arc::new(LoginManager::new(
            Arc::clone(&config.sync_backend),
            credentials,
            event_bus.clone(),
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            SyncConfig::from(&config),
            Arc::clone(&config.sync_backend),
            Arc::clone(&config.collection),
            Arc::clone(&login),
            event_bus.clone(),
        ));

        info!(config = ?config, "Sync service initialized");
        Ok(Self {
            config,
            event_bus,
            login,
            coordinator,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken> {
        Ok(self.login.login(username, password).await?)
    }

    pub async fn logout(&self) -> Result<()> {
        Ok(self.login.logout().await?)
    }

    pub async fn current_login(&self) -> Result<LoginState> {
        Ok(self.login.current_login().await?)
    }

    /// Run a session with the stored login and wait for it to finish.
    pub async fn sync(
        &self,
        directive: ConflictResolution,
        cancellation_token: CancellationToken,
    ) -> Result<SyncSessionResult> {
        Ok(self
            .coordinator
            .sync_with_stored_login(directive, cancellation_token)
            .await?)
    }

    /// Start a session with the stored login in the background.
    pub async fn start_sync(&self, directive: ConflictResolution) -> Result<SyncHandle> {
        let token = self
            .login
            .current_token()
            .await
            .map_err(core_sync::SyncError::from)?;
        Ok(self.coordinator.start_sync(token, directive)?)
    }

    pub async fn cancel_sync(&self) -> bool {
        self.coordinator.cancel_sync().await
    }

    pub fn is_sync_active(&self) -> bool {
        self.coordinator.is_sync_active()
    }

    pub async fn last_session(&self) -> Option<SyncSession> {
        self.coordinator.last_session().await
    }

    /// Stream of auth and sync events emitted from now on.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Opens the collection and settings databases under `paths`, uses the OS
/// keyring for the hkey and writes backups to `paths.backup_dir()`.
///
/// ```no_run
/// # async fn example(backend: std::sync::Arc<dyn bridge_traits::SyncBackend>) -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, CancellationToken, ConflictResolution, DesktopPaths};
///
/// let paths = DesktopPaths::from_system().expect("data directory");
/// let service = bootstrap_desktop(paths, backend).await?;
/// service.login("alice", "pw1").await?;
/// service.sync(ConflictResolution::None, CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    paths: DesktopPaths,
    backend: Arc<dyn bridge_traits::SyncBackend>,
) -> Result<SyncService> {
    use bridge_desktop::{SqliteCollection, SqliteSettingsStore};

    let collection = SqliteCollection::open(paths.collection_db())
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    let settings = SqliteSettingsStore::new(paths.settings_db())
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

    let config = CoreConfig::builder()
        .sync_backend(backend)
        .collection(Arc::new(collection))
        .settings_store(Arc::new(settings))
        .backup_dir(paths.backup_dir())
        .build()?;

    SyncService::new(config)
}

#[cfg(all(test, feature = "desktop-shims"))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::{SqliteCollection, SqliteSettingsStore};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{
        CollectionStore, CompareResponse, ProgressReporter, SecureStore, SyncBackend,
    };
    use core_runtime::events::{AuthEvent, SyncEvent};
    use mockall::mock;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    mock! {
        Backend {}

        #[async_trait]
        impl SyncBackend for Backend {
            async fn login(
                &self,
                username: &str,
                password: &str,
                progress: Arc<dyn ProgressReporter>,
            ) -> BridgeResult<AuthToken>;
            async fn compare_collections(
                &self,
                token: &AuthToken,
                progress: Arc<dyn ProgressReporter>,
            ) -> BridgeResult<CompareResponse>;
            async fn full_download(
                &self,
                token: &AuthToken,
                progress: Arc<dyn ProgressReporter>,
            ) -> BridgeResult<()>;
            async fn full_upload(
                &self,
                token: &AuthToken,
                progress: Arc<dyn ProgressReporter>,
            ) -> BridgeResult<()>;
            async fn sync_media(
                &self,
                token: &AuthToken,
                progress: Arc<dyn ProgressReporter>,
            ) -> BridgeResult<()>;
        }
    }

    #[derive(Default)]
    struct MemorySecureStore {
        data: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.data
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.data.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.data.lock().await.keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.data.lock().await.clear();
            Ok(())
        }
    }

    async fn service(backend: MockBackend, dir: &TempDir) -> SyncService {
        let collection = SqliteCollection::open(dir.path().join("collection.db"))
            .await
            .unwrap();
        let settings = SqliteSettingsStore::in_memory().await.unwrap();

        let config = CoreConfig::builder()
            .sync_backend(Arc::new(backend))
            .collection(Arc::new(collection))
            .secure_store(Arc::new(MemorySecureStore::default()))
            .settings_store(Arc::new(settings))
            .backup_dir(dir.path().join("backups"))
            .build()
            .unwrap();
        SyncService::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_login_then_forced_download() {
        let dir = TempDir::new().unwrap();
        let mut backend = MockBackend::new();
        backend
            .expect_login()
            .times(1)
            .returning(|_, _, _| Ok(AuthToken::new("abc")));
        backend
            .expect_full_download()
            .withf(|token, _| token.hkey() == "abc")
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_sync_media().times(1).returning(|_, _| Ok(()));
        backend.expect_compare_collections().never();

        let service = service(backend, &dir).await;
        let mut events = service.events();

        service.login("alice", "pw1").await.unwrap();
        let state = service.current_login().await.unwrap();
        assert_eq!((state.username.as_str(), state.hkey.as_str()), ("alice", "abc"));

        let result = service
            .sync(ConflictResolution::ForceDownload, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            SyncSessionResult::Completed {
                path: SyncPath::FullDownload,
                media: MediaSyncStatus::Completed,
            }
        );

        let backups = std::fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
        assert!(service.config().collection.is_open().await);

        let drained = events.drain();
        assert!(drained
            .iter()
            .any(|e| matches!(e, CoreEvent::Auth(AuthEvent::LoggedIn { .. }))));
        assert!(drained
            .iter()
            .any(|e| matches!(e, CoreEvent::Sync(SyncEvent::Completed { .. }))));
    }

    #[tokio::test]
    async fn test_rejected_hkey_logs_out() {
        let dir = TempDir::new().unwrap();
        let mut backend = MockBackend::new();
        backend
            .expect_login()
            .returning(|_, _, _| Ok(AuthToken::new("abc")));
        backend
            .expect_compare_collections()
            .returning(|_, _| Err(BridgeError::AuthFailed("hkey revoked".into())));
        backend.expect_sync_media().never();

        let service = service(backend, &dir).await;
        service.login("alice", "pw1").await.unwrap();

        let err = service
            .sync(ConflictResolution::None, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Sync(ref e) if e.is_auth_failure()));

        let state = service.current_login().await.unwrap();
        assert!(!state.is_logged_in());
        assert!(matches!(
            service.start_sync(ConflictResolution::None).await,
            Err(CoreError::Sync(core_sync::SyncError::NotLoggedIn))
        ));
    }

    #[tokio::test]
    async fn test_missing_backend_is_reported() {
        let err = CoreConfig::builder()
            .settings_store(Arc::new(SqliteSettingsStore::in_memory().await.unwrap()))
            .build()
            .unwrap_err();
        assert!(matches!(
            CoreError::from(err),
            CoreError::CapabilityMissing { ref capability, .. } if capability == "SyncBackend"
        ));
    }
}
