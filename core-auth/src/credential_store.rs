//! Persisted login state.
//!
//! The username and endpoint are plain settings; the hkey lives in the
//! platform secure store. A missing value reads back as an empty string so
//! that a fresh install and a cleared login look the same.

use crate::error::{AuthError, Result};
use crate::types::{AuthToken, LoginState};
use bridge_traits::{BridgeError, SecureStore, SettingsStore};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const USERNAME_KEY: &str = "sync.username";
pub const ENDPOINT_KEY: &str = "sync.endpoint";
pub const HKEY_KEY: &str = "sync.hkey";

fn secure_err(err: BridgeError) -> AuthError {
    AuthError::SecureStorageUnavailable(err.to_string())
}

fn settings_err(err: BridgeError) -> AuthError {
    AuthError::SettingsUnavailable(err.to_string())
}

#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    settings_store: Arc<dyn SettingsStore>,
}

impl CredentialStore {
    pub fn new(
        secure_store: Arc<dyn SecureStore>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            secure_store,
            settings_store,
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<LoginState> {
        let username = self
            .settings_store
            .get_string(USERNAME_KEY)
            .await
            .map_err(settings_err)?
            .unwrap_or_default();
        let endpoint = self
            .settings_store
            .get_string(ENDPOINT_KEY)
            .await
            .map_err(settings_err)?
            .filter(|e| !e.is_empty());
        let hkey = match self
            .secure_store
            .get_secret(HKEY_KEY)
            .await
            .map_err(secure_err)?
        {
            Some(bytes) => String::from_utf8(bytes)
                .map_err(|_| AuthError::CorruptCredentials("hkey is not valid UTF-8".into()))?,
            None => String::new(),
        };

        Ok(LoginState {
            username,
            hkey,
            endpoint,
        })
    }

    /// Persist a successful login. The hkey is written before the username
    /// so a failed write never leaves a username paired with a stale key.
    #[instrument(skip(self, token))]
    pub async fn store(&self, username: &str, token: &AuthToken) -> Result<()> {
        self.secure_store
            .set_secret(HKEY_KEY, token.hkey().as_bytes())
            .await
            .map_err(secure_err)?;
        self.settings_store
            .set_string(USERNAME_KEY, username)
            .await
            .map_err(settings_err)?;
        match token.endpoint() {
            Some(endpoint) => self.update_endpoint(endpoint).await?,
            None => self
                .settings_store
                .delete(ENDPOINT_KEY)
                .await
                .map_err(settings_err)?,
        }
        debug!("Stored login state");
        Ok(())
    }

    pub async fn update_endpoint(&self, endpoint: &str) -> Result<()> {
        self.settings_store
            .set_string(ENDPOINT_KEY, endpoint)
            .await
            .map_err(settings_err)
    }

    /// Reset to the logged-out state `("", "")`.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.settings_store
            .set_string(USERNAME_KEY, "")
            .await
            .map_err(settings_err)?;
        self.secure_store
            .delete_secret(HKEY_KEY)
            .await
            .map_err(secure_err)?;
        self.settings_store
            .delete(ENDPOINT_KEY)
            .await
            .map_err(settings_err)?;
        debug!("Cleared login state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemorySecureStore, MemorySettingsStore};

    fn store() -> (CredentialStore, Arc<MemorySecureStore>, Arc<MemorySettingsStore>) {
        let secure = Arc::new(MemorySecureStore::default());
        let settings = Arc::new(MemorySettingsStore::default());
        (
            CredentialStore::new(secure.clone(), settings.clone()),
            secure,
            settings,
        )
    }

    #[tokio::test]
    async fn test_fresh_store_is_logged_out() {
        let (credentials, _, _) = store();
        let state = credentials.load().await.unwrap();
        assert_eq!(state, LoginState::empty());
        assert!(!state.is_logged_in());
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let (credentials, secure, settings) = store();
        let token = AuthToken::new("abc").with_endpoint("https://sync3.example.net/");
        credentials.store("alice", &token).await.unwrap();

        assert_eq!(secure.get(HKEY_KEY).await, Some(b"abc".to_vec()));
        assert_eq!(settings.get(USERNAME_KEY).await.as_deref(), Some("alice"));

        let state = credentials.load().await.unwrap();
        assert_eq!(state.username, "alice");
        assert_eq!(state.hkey, "abc");
        assert_eq!(state.endpoint.as_deref(), Some("https://sync3.example.net/"));
    }

    #[tokio::test]
    async fn test_clear_resets_to_empty_pair() {
        let (credentials, secure, _) = store();
        credentials
            .store("alice", &AuthToken::new("abc").with_endpoint("https://x/"))
            .await
            .unwrap();

        credentials.clear().await.unwrap();

        let state = credentials.load().await.unwrap();
        assert_eq!(state.username, "");
        assert_eq!(state.hkey, "");
        assert_eq!(state.endpoint, None);
        assert!(secure.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_without_endpoint_drops_old_one() {
        let (credentials, _, _) = store();
        credentials
            .store("alice", &AuthToken::new("abc").with_endpoint("https://x/"))
            .await
            .unwrap();
        credentials
            .store("bob", &AuthToken::new("def"))
            .await
            .unwrap();

        let state = credentials.load().await.unwrap();
        assert_eq!(state.username, "bob");
        assert_eq!(state.endpoint, None);
    }

    #[tokio::test]
    async fn test_corrupt_hkey() {
        let (credentials, secure, _) = store();
        secure.set_secret(HKEY_KEY, &[0xff, 0xfe]).await.unwrap();
        assert!(matches!(
            credentials.load().await,
            Err(AuthError::CorruptCredentials(_))
        ));
    }
}
