//! # Sync Coordinator
//!
//! Drives one sync session against the remote backend.
//!
//! ## Workflow
//!
//! A session takes exactly one of these paths, selected by the caller's
//! [`ConflictResolution`] and, for a normal sync, by the remote's answer to
//! "compare collections":
//!
//! | Directive / outcome          | Path                              |
//! |------------------------------|-----------------------------------|
//! | `ForceDownload`              | full download, then media         |
//! | `ForceUpload`                | full upload, then media           |
//! | no changes / merge applied   | media                             |
//! | full download required       | full download, then media         |
//! | full upload required         | full upload, then media           |
//! | conflict                     | prompt the user; nothing else     |
//! | unknown or missing code      | `InternalInvariantViolation`      |
//!
//! A full download first takes a forced, blocking backup. Both full paths
//! close the collection before the transfer and always reopen it afterwards,
//! whether the transfer succeeded, failed or was cancelled.
//!
//! An auth failure from any remote call clears the stored login and ends
//! the session. Only one session runs at a time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{ConflictResolution, SyncCoordinator};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(coordinator: std::sync::Arc<SyncCoordinator>) -> core_sync::Result<()> {
//! let result = coordinator
//!     .sync_with_stored_login(ConflictResolution::None, CancellationToken::new())
//!     .await?;
//!
//! // Or in the background
//! let token = core_auth::AuthToken::new("hkey");
//! let handle = coordinator.start_sync(token, ConflictResolution::ForceUpload)?;
//! handle.cancel();
//! let _ = handle.wait().await;
//! # Ok(())
//! # }
//! ```

use crate::guard::CollectionGuard;
use crate::outcome::{
    ConflictResolution, MediaSyncStatus, SyncOutcome, SyncPath, SyncSessionResult,
};
use crate::progress::SessionProgress;
use crate::session::{SyncSession, SyncSessionId};
use crate::{Result, SyncError};
use bridge_traits::{BackupOptions, CollectionStore, CompareResponse, SyncBackend};
use core_auth::{AuthToken, LoginManager};
use core_runtime::config::{CoreConfig, MediaFailurePolicy};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Where the forced backup before a full download is written.
    pub backup_dir: PathBuf,

    /// Run media sync after a completed collection sync.
    pub sync_media: bool,

    pub media_failure_policy: MediaFailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("backups"),
            sync_media: true,
            media_failure_policy: MediaFailurePolicy::default(),
        }
    }
}

impl From<&CoreConfig> for SyncConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            backup_dir: config.backup_dir.clone(),
            sync_media: config.features.sync_media,
            media_failure_policy: config.features.media_failure_policy,
        }
    }
}

/// The session currently holding the coordinator.
#[derive(Clone)]
struct ActiveSession {
    id: SyncSessionId,
    cancellation_token: CancellationToken,
}

/// Claim on the coordinator for one session. Dropping it, even with the
/// session future, frees the coordinator and unregisters the session.
struct SessionPermit {
    _lock: OwnedMutexGuard<()>,
    id: SyncSessionId,
    active: Arc<StdMutex<Option<ActiveSession>>>,
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if active.as_ref().is_some_and(|a| a.id == self.id) {
                *active = None;
            }
        }
    }
}

/// Per-session state threaded through the paths.
struct SessionContext {
    id: SyncSessionId,
    token: AuthToken,
    cancellation_token: CancellationToken,
    path: Option<SyncPath>,
}

impl SessionContext {
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}

/// Handle to a session running in the background.
pub struct SyncHandle {
    session_id: SyncSessionId,
    cancellation_token: CancellationToken,
    task: JoinHandle<Result<SyncSessionResult>>,
}

impl SyncHandle {
    pub fn session_id(&self) -> SyncSessionId {
        self.session_id
    }

    /// Request cancellation. The collection is still reopened if a full
    /// transfer was running.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<SyncSessionResult> {
        self.task
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))?
    }
}

pub struct SyncCoordinator {
    config: SyncConfig,

    backend: Arc<dyn SyncBackend>,

    collection: Arc<dyn CollectionStore>,

    /// Used to clear the stored login on auth failure and to persist
    /// endpoint changes.
    login_manager: Arc<LoginManager>,

    event_bus: EventBus,

    /// Held for the whole of a session.
    session_lock: Arc<Mutex<()>>,

    /// Registered together with the session lock.
    active: Arc<StdMutex<Option<ActiveSession>>>,

    last_session: RwLock<Option<SyncSession>>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        backend: Arc<dyn SyncBackend>,
        collection: Arc<dyn CollectionStore>,
        login_manager: Arc<LoginManager>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config,
            backend,
            collection,
            login_manager,
            event_bus,
            session_lock: Arc::new(Mutex::new(())),
            active: Arc::new(StdMutex::new(None)),
            last_session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one sync session to completion.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SyncInProgress`] if another session holds the coordinator
    /// - [`SyncError::AuthFailure`] if the remote rejected `auth`; the stored
    ///   login has been cleared
    /// - [`SyncError::Transport`] for any other backend failure
    /// - [`SyncError::InternalInvariantViolation`] for an unknown outcome code
    /// - [`SyncError::Cancelled`] if `cancellation_token` fired
    pub async fn perform_sync(
        &self,
        auth: &AuthToken,
        directive: ConflictResolution,
        cancellation_token: CancellationToken,
    ) -> Result<SyncSessionResult> {
        let session = SyncSession::new(directive);
        let permit = self.acquire_session(session.id, &cancellation_token)?;
        self.run_session(permit, session, auth.clone(), cancellation_token)
            .await
    }

    /// Like [`perform_sync`](Self::perform_sync), using the persisted login.
    pub async fn sync_with_stored_login(
        &self,
        directive: ConflictResolution,
        cancellation_token: CancellationToken,
    ) -> Result<SyncSessionResult> {
        let token = self.login_manager.current_token().await?;
        self.perform_sync(&token, directive, cancellation_token).await
    }

    /// Spawn a session onto the runtime.
    ///
    /// The coordinator is claimed before this returns, so a second call made
    /// while the first session runs fails with [`SyncError::SyncInProgress`].
    pub fn start_sync(
        self: &Arc<Self>,
        auth: AuthToken,
        directive: ConflictResolution,
    ) -> Result<SyncHandle> {
        let session = SyncSession::new(directive);
        let session_id = session.id;
        let cancellation_token = CancellationToken::new();
        let permit = self.acquire_session(session_id, &cancellation_token)?;

        let coordinator = Arc::clone(self);
        let token = cancellation_token.clone();
        let task = tokio::spawn(async move {
            coordinator.run_session(permit, session, auth, token).await
        });

        Ok(SyncHandle {
            session_id,
            cancellation_token,
            task,
        })
    }

    /// Cancel the running session. Returns false when nothing is running.
    #[instrument(skip(self))]
    pub async fn cancel_sync(&self) -> bool {
        let active = match self.active.lock() {
            Ok(active) => (*active).clone(),
            Err(_) => return false,
        };
        match active {
            Some(active) => {
                info!(session_id = %active.id, "Cancelling sync session");
                active.cancellation_token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_sync_active(&self) -> bool {
        self.session_lock.try_lock().is_err()
    }

    /// Record of the most recent session, including one still running.
    pub async fn last_session(&self) -> Option<SyncSession> {
        self.last_session.read().await.clone()
    }

    fn acquire_session(
        &self,
        id: SyncSessionId,
        cancellation_token: &CancellationToken,
    ) -> Result<SessionPermit> {
        let lock = Arc::clone(&self.session_lock).try_lock_owned().map_err(|_| {
            warn!("Sync requested while another session is running");
            SyncError::SyncInProgress
        })?;

        let mut active = self
            .active
            .lock()
            .map_err(|_| SyncError::TaskFailed("active session registry poisoned".into()))?;
        *active = Some(ActiveSession {
            id,
            cancellation_token: cancellation_token.clone(),
        });
        drop(active);

        Ok(SessionPermit {
            _lock: lock,
            id,
            active: Arc::clone(&self.active),
        })
    }

    #[instrument(
        skip(self, _permit, session, token, cancellation_token),
        fields(session_id = %session.id, directive = %session.directive)
    )]
    async fn run_session(
        &self,
        _permit: SessionPermit,
        session: SyncSession,
        token: AuthToken,
        cancellation_token: CancellationToken,
    ) -> Result<SyncSessionResult> {
        let session = session.start()?;
        let directive = session.directive;
        *self.last_session.write().await = Some(session.clone());

        info!("Sync session started");
        self.emit(SyncEvent::Started {
            session_id: session.id.to_string(),
            directive: directive.as_str().to_string(),
        });

        let mut ctx = SessionContext {
            id: session.id,
            token,
            cancellation_token,
            path: None,
        };

        let result = self.drive(&mut ctx, directive).await;

        if let Err(SyncError::AuthFailure(reason)) = &result {
            warn!("Remote rejected the login; clearing stored credentials");
            if let Err(e) = self.login_manager.invalidate(reason).await {
                error!(error = %e, "Failed to clear stored credentials");
            }
        }

        self.finish_session(session, ctx.path, &result).await;
        result
    }

    async fn drive(
        &self,
        ctx: &mut SessionContext,
        directive: ConflictResolution,
    ) -> Result<SyncSessionResult> {
        match directive {
            ConflictResolution::ForceDownload => {
                self.full_download(ctx).await?;
                self.complete_with_media(ctx, SyncPath::FullDownload).await
            }
            ConflictResolution::ForceUpload => {
                self.full_upload(ctx).await?;
                self.complete_with_media(ctx, SyncPath::FullUpload).await
            }
            ConflictResolution::None => self.normal_sync(ctx).await,
        }
    }

    async fn normal_sync(&self, ctx: &mut SessionContext) -> Result<SyncSessionResult> {
        ctx.check_cancelled()?;
        debug!("Comparing collections");

        let progress = self.progress(ctx, SyncPath::Normal.as_str());
        let response = self
            .remote(
                &ctx.cancellation_token,
                self.backend.compare_collections(&ctx.token, progress),
            )
            .await?;

        self.apply_server_hints(ctx, &response).await;

        let outcome = SyncOutcome::from_response(&response).inspect_err(|e| {
            error!(code = ?response.required, error = %e, "Unrecognized sync outcome");
        })?;
        info!(?outcome, "Compared collections");

        match outcome {
            SyncOutcome::NoChanges | SyncOutcome::NormalSyncCompleted => {
                self.complete_with_media(ctx, SyncPath::Normal).await
            }
            SyncOutcome::FullDownloadRequired => {
                self.full_download(ctx).await?;
                self.complete_with_media(ctx, SyncPath::FullDownload).await
            }
            SyncOutcome::FullUploadRequired => {
                self.full_upload(ctx).await?;
                self.complete_with_media(ctx, SyncPath::FullUpload).await
            }
            SyncOutcome::ConflictRequiresUserChoice => {
                info!("Collections diverged; waiting for the user to pick a direction");
                self.emit(SyncEvent::ConflictDetected {
                    session_id: ctx.id.to_string(),
                });
                Ok(SyncSessionResult::AwaitingConflictResolution)
            }
        }
    }

    /// Backup, close, download, reopen.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.id))]
    async fn full_download(&self, ctx: &mut SessionContext) -> Result<()> {
        ctx.path = Some(SyncPath::FullDownload);
        ctx.check_cancelled()?;

        let backup = self
            .collection
            .create_backup(
                &self.config.backup_dir,
                BackupOptions {
                    force: true,
                    wait_for_completion: true,
                },
            )
            .await
            .map_err(SyncError::Backup)?;
        if let Some(path) = backup {
            info!(backup = %path.display(), "Collection backed up before full download");
        }
        ctx.check_cancelled()?;

        let guard = CollectionGuard::close_for_full_sync(Arc::clone(&self.collection)).await?;
        let progress = self.progress(ctx, SyncPath::FullDownload.as_str());
        let transfer = self
            .remote(
                &ctx.cancellation_token,
                self.backend.full_download(&ctx.token, progress),
            )
            .await;
        let reopened = guard.release().await;

        transfer?;
        reopened?;
        info!("Full download finished");
        Ok(())
    }

    /// Close, upload, reopen.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.id))]
    async fn full_upload(&self, ctx: &mut SessionContext) -> Result<()> {
        ctx.path = Some(SyncPath::FullUpload);
        ctx.check_cancelled()?;

        let guard = CollectionGuard::close_for_full_sync(Arc::clone(&self.collection)).await?;
        let progress = self.progress(ctx, SyncPath::FullUpload.as_str());
        let transfer = self
            .remote(
                &ctx.cancellation_token,
                self.backend.full_upload(&ctx.token, progress),
            )
            .await;
        let reopened = guard.release().await;

        transfer?;
        reopened?;
        info!("Full upload finished");
        Ok(())
    }

    async fn complete_with_media(
        &self,
        ctx: &mut SessionContext,
        path: SyncPath,
    ) -> Result<SyncSessionResult> {
        ctx.path = Some(path);
        self.emit(SyncEvent::CollectionSynced {
            session_id: ctx.id.to_string(),
            path: path.as_str().to_string(),
        });

        let media = self.media_sync(ctx).await?;
        Ok(SyncSessionResult::Completed { path, media })
    }

    async fn media_sync(&self, ctx: &SessionContext) -> Result<MediaSyncStatus> {
        if !self.config.sync_media {
            debug!("Media sync disabled");
            return Ok(MediaSyncStatus::Disabled);
        }
        ctx.check_cancelled()?;

        let session_id = ctx.id.to_string();
        self.emit(SyncEvent::MediaSyncStarted {
            session_id: session_id.clone(),
        });

        let progress = self.progress(ctx, "media");
        let result = self
            .remote(
                &ctx.cancellation_token,
                self.backend.sync_media(&ctx.token, progress),
            )
            .await;

        match result {
            Ok(()) => {
                self.emit(SyncEvent::MediaSyncCompleted { session_id });
                Ok(MediaSyncStatus::Completed)
            }
            Err(e @ (SyncError::AuthFailure(_) | SyncError::Cancelled)) => Err(e),
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Media sync failed");
                self.emit(SyncEvent::MediaSyncFailed {
                    session_id,
                    message: message.clone(),
                });
                match self.config.media_failure_policy {
                    MediaFailurePolicy::Isolate => Ok(MediaSyncStatus::Failed(message)),
                    MediaFailurePolicy::FailSession => Err(SyncError::Media(message)),
                }
            }
        }
    }

    /// Surface the server message and follow an endpoint redirect for the
    /// rest of the session.
    async fn apply_server_hints(&self, ctx: &mut SessionContext, response: &CompareResponse) {
        if let Some(message) = response.server_message.as_deref().filter(|m| !m.is_empty()) {
            info!(server_message = message, "Message from sync server");
            self.emit(SyncEvent::ServerMessage {
                session_id: ctx.id.to_string(),
                message: message.to_string(),
            });
        }

        if let Some(endpoint) = response.new_endpoint.as_deref().filter(|e| !e.is_empty()) {
            info!(endpoint, "Sync endpoint changed");
            if let Err(e) = self.login_manager.update_endpoint(endpoint).await {
                warn!(error = %e, "Failed to persist new sync endpoint");
            }
            ctx.token = ctx.token.clone().with_endpoint(endpoint);
        }
    }

    /// Await a backend call, giving up as soon as the session is cancelled.
    async fn remote<T, F>(&self, cancellation_token: &CancellationToken, call: F) -> Result<T>
    where
        F: Future<Output = bridge_traits::error::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => {
                info!("Cancellation requested; aborting backend request");
                if let Err(e) = self.backend.abort().await {
                    warn!(error = %e, "Backend abort failed");
                }
                Err(SyncError::Cancelled)
            }
            result = call => result.map_err(SyncError::from),
        }
    }

    async fn finish_session(
        &self,
        session: SyncSession,
        path: Option<SyncPath>,
        result: &Result<SyncSessionResult>,
    ) {
        let session_id = session.id.to_string();
        let finished = match result {
            Ok(SyncSessionResult::Completed { path, media }) => {
                let finished = session.complete(*path, media.clone());
                if let Ok(record) = &finished {
                    info!(path = %path, media = media.as_str(), "Sync session completed");
                    self.emit(SyncEvent::Completed {
                        session_id,
                        path: path.as_str().to_string(),
                        media: media.as_str().to_string(),
                        duration_ms: record.duration_ms().unwrap_or(0),
                    });
                }
                finished
            }
            Ok(SyncSessionResult::AwaitingConflictResolution) => session.await_user_choice(),
            Err(SyncError::Cancelled) => {
                info!("Sync session cancelled");
                self.emit(SyncEvent::Cancelled { session_id });
                session.cancel(path)
            }
            Err(e) => {
                error!(error = %e, "Sync session failed");
                self.emit(SyncEvent::Failed {
                    session_id,
                    message: e.to_string(),
                    recoverable: e.is_recoverable(),
                });
                session.fail(e.to_string(), path)
            }
        };

        match finished {
            Ok(record) => *self.last_session.write().await = Some(record),
            Err(e) => error!(error = %e, "Failed to record session outcome"),
        }
    }

    fn progress(&self, ctx: &SessionContext, phase: &'static str) -> Arc<SessionProgress> {
        Arc::new(SessionProgress::new(
            self.event_bus.clone(),
            ctx.id.to_string(),
            phase,
        ))
    }

    fn emit(&self, event: SyncEvent) {
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }
}
