use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The remote rejected the supplied credentials or hkey.
    #[error("Authentication rejected by remote: {0}")]
    AuthFailed(String),

    /// Network or protocol failure talking to the remote.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns true when the remote refused the credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, BridgeError::AuthFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        assert!(BridgeError::AuthFailed("bad hkey".into()).is_auth_failure());
        assert!(!BridgeError::Transport("reset".into()).is_auth_failure());
        assert!(!BridgeError::OperationFailed("x".into()).is_auth_failure());
    }

    #[test]
    fn test_display_messages() {
        let err = BridgeError::Transport("connection reset".to_string());
        assert_eq!(err.to_string(), "Transport failure: connection reset");
    }
}
