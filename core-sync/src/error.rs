use bridge_traits::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote rejected the hkey. Stored credentials have been cleared.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Network or server failure, passed through from the backend.
    #[error("Transport failure: {0}")]
    Transport(#[source] BridgeError),

    /// The backend returned a change classification the protocol does not define.
    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolation(String),

    #[error("A sync session is already in progress")]
    SyncInProgress,

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Collection error: {0}")]
    Collection(#[source] BridgeError),

    #[error("Backup failed: {0}")]
    Backup(#[source] BridgeError),

    #[error("Media sync failed: {0}")]
    Media(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Credential store error: {0}")]
    Credentials(#[source] AuthError),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Sync task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SyncError::AuthFailure(_))
    }

    /// Whether retrying the session later may succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_)
                | SyncError::SyncInProgress
                | SyncError::Cancelled
                | SyncError::Media(_)
                | SyncError::Backup(_)
        )
    }
}

impl From<BridgeError> for SyncError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::AuthFailed(reason) => SyncError::AuthFailure(reason),
            other => SyncError::Transport(other),
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotLoggedIn => SyncError::NotLoggedIn,
            AuthError::AuthenticationFailed { reason } => SyncError::AuthFailure(reason),
            other => SyncError::Credentials(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
