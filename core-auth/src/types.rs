use crate::error::{AuthError, Result};
pub use bridge_traits::AuthToken;
use std::fmt;

/// Username and password typed by the user.
///
/// Only ever held for the duration of a login call; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Rejects blank usernames and empty passwords before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(
                "username cannot be empty".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "password cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The persisted login: who is logged in and with which hkey.
///
/// A logged-out state is `("", "")`, which is also what a rejected hkey
/// leaves behind.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginState {
    pub username: String,
    pub hkey: String,
    pub endpoint: Option<String>,
}

impl LoginState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        !self.hkey.is_empty()
    }

    /// Token for sync calls, if logged in.
    pub fn to_token(&self) -> Option<AuthToken> {
        if !self.is_logged_in() {
            return None;
        }
        let token = AuthToken::new(self.hkey.clone());
        Some(match &self.endpoint {
            Some(endpoint) => token.with_endpoint(endpoint.clone()),
            None => token,
        })
    }
}

impl fmt::Debug for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginState")
            .field("username", &self.username)
            .field("hkey", &if self.hkey.is_empty() { "" } else { "[REDACTED]" })
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        assert!(LoginCredentials::new("alice", "pw1").validate().is_ok());
        assert!(matches!(
            LoginCredentials::new("  ", "pw1").validate(),
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            LoginCredentials::new("alice", "").validate(),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let debug = format!("{:?}", LoginCredentials::new("alice", "hunter2"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_login_state_token() {
        assert_eq!(LoginState::empty().to_token(), None);
        assert!(!LoginState::empty().is_logged_in());

        let state = LoginState {
            username: "alice".to_string(),
            hkey: "abc".to_string(),
            endpoint: Some("https://sync2.example.net/".to_string()),
        };
        let token = state.to_token().unwrap();
        assert_eq!(token.hkey(), "abc");
        assert_eq!(token.endpoint(), Some("https://sync2.example.net/"));
        assert!(!format!("{:?}", state).contains("abc"));
    }
}
