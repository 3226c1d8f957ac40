use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The remote rejected the username/password or the stored hkey.
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// Any other backend failure during login, passed through unchanged.
    #[error("Sync backend error: {0}")]
    Backend(#[source] BridgeError),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Settings storage unavailable: {0}")]
    SettingsUnavailable(String),

    #[error("Stored credentials are corrupt: {0}")]
    CorruptCredentials(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("A login is already in progress")]
    LoginInProgress,
}

impl AuthError {
    /// True when the remote refused the credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AuthError::AuthenticationFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
