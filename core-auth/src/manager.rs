//! # Login Manager
//!
//! Exchanges a username and password for an hkey, persists the result and
//! wipes it again when the remote later rejects it.
//!
//! Every state change is published on the [`EventBus`] as a
//! [`CoreEvent::Auth`] so a UI can follow along without polling.

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::types::{AuthToken, LoginCredentials, LoginState};
use bridge_traits::{NoopProgress, SyncBackend};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

pub struct LoginManager {
    backend: Arc<dyn SyncBackend>,
    credentials: CredentialStore,
    event_bus: EventBus,
    /// Held for the duration of a login request.
    in_progress: Mutex<()>,
}

impl LoginManager {
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        credentials: CredentialStore,
        event_bus: EventBus,
    ) -> Self {
        Self {
            backend,
            credentials,
            event_bus,
            in_progress: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Log in and persist `(username, hkey)`.
    ///
    /// A rejected login clears whatever was stored before and returns
    /// [`AuthError::AuthenticationFailed`]. Other backend errors leave the
    /// stored login untouched and come back as [`AuthError::Backend`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken> {
        let credentials = LoginCredentials::new(username, password);
        credentials.validate()?;

        let Ok(_guard) = self.in_progress.try_lock() else {
            warn!("Login already in progress");
            return Err(AuthError::LoginInProgress);
        };

        info!("Logging in");
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::LoggingIn {
            username: credentials.username().to_string(),
        }));

        let result = self
            .backend
            .login(
                credentials.username(),
                credentials.password(),
                Arc::new(NoopProgress),
            )
            .await;

        match result {
            Ok(token) => {
                self.credentials
                    .store(credentials.username(), &token)
                    .await?;
                info!("Login succeeded");
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::LoggedIn {
                    username: credentials.username().to_string(),
                }));
                Ok(token)
            }
            Err(err) if err.is_auth_failure() => {
                let reason = err.to_string();
                warn!(error = %reason, "Login rejected by remote");
                self.invalidate(&reason).await?;
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: reason.clone(),
                    recoverable: false,
                }));
                Err(AuthError::AuthenticationFailed { reason })
            }
            Err(err) => {
                error!(error = %err, "Login failed");
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: err.to_string(),
                    recoverable: true,
                }));
                Err(AuthError::Backend(err))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let previous = self.credentials.load().await?;
        self.credentials.clear().await?;
        info!("Logged out");
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::LoggedOut {
            username: previous.username,
        }));
        Ok(())
    }

    pub async fn current_login(&self) -> Result<LoginState> {
        self.credentials.load().await
    }

    /// Token for the stored login, or [`AuthError::NotLoggedIn`].
    pub async fn current_token(&self) -> Result<AuthToken> {
        self.credentials
            .load()
            .await?
            .to_token()
            .ok_or(AuthError::NotLoggedIn)
    }

    /// Wipe the stored login after the remote rejected it.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, reason: &str) -> Result<()> {
        self.credentials.clear().await?;
        warn!("Stored login cleared");
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::CredentialsCleared {
                reason: reason.to_string(),
            }));
        Ok(())
    }

    pub async fn update_endpoint(&self, endpoint: &str) -> Result<()> {
        self.credentials.update_endpoint(endpoint).await
    }
}
