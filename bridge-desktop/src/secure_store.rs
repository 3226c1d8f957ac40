//! Secure Credential Storage using OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::{debug, error, warn};

const DEFAULT_SERVICE_NAME: &str = "collection-sync";

/// Keyring-based secure storage
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// The OS keyring cannot enumerate entries, so the store remembers the keys it
/// has written during this process. `list_keys` and `clear_all` only see
/// those.
pub struct KeyringSecureStore {
    service_name: String,
    known_keys: Mutex<BTreeSet<String>>,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            known_keys: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(Self::map_keyring_error)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        match e {
            keyring::Error::NoStorageAccess(inner) => {
                BridgeError::NotAvailable(format!("Keyring not accessible: {}", inner))
            }
            keyring::Error::PlatformFailure(inner) => {
                BridgeError::NotAvailable(format!("Keyring platform failure: {}", inner))
            }
            other => BridgeError::OperationFailed(format!("Keyring error: {}", other)),
        }
    }

    fn remember(&self, key: &str) {
        if let Ok(mut keys) = self.known_keys.lock() {
            keys.insert(key.to_string());
        }
    }

    fn forget(&self, key: &str) {
        if let Ok(mut keys) = self.known_keys.lock() {
            keys.remove(key);
        }
    }

    fn snapshot_keys(&self) -> Vec<String> {
        self.known_keys
            .lock()
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        // Keyring only stores strings
        let encoded = STANDARD.encode(value);

        self.entry(key)?
            .set_password(&encoded)
            .map_err(Self::map_keyring_error)?;
        self.remember(key);

        debug!(key = key, "Stored secret in keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entry(key)?.get_password() {
            Ok(encoded) => {
                let decoded = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    error!(key = key, error = %e, "Failed to decode secret");
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;
                self.remember(key);
                Ok(Some(decoded))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key = key, "Secret not found in keyring");
                Ok(None)
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let result = match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(key = key, "Deleted secret from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Self::map_keyring_error(e)),
        };
        self.forget(key);
        result
    }

    async fn has_secret(&self, key: &str) -> Result<bool> {
        match self.entry(key)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.snapshot_keys())
    }

    async fn clear_all(&self) -> Result<()> {
        let keys = self.snapshot_keys();
        if keys.is_empty() {
            warn!("clear_all called with no tracked keyring entries");
        }
        for key in keys {
            self.delete_secret(&key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let store = KeyringSecureStore::new();
        assert_eq!(store.service_name(), "collection-sync");

        let custom = KeyringSecureStore::with_service_name("collection-sync-test");
        assert_eq!(custom.service_name(), "collection-sync-test");
    }

    #[tokio::test]
    async fn test_list_keys_starts_empty() {
        let store = KeyringSecureStore::with_service_name("collection-sync-test");
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_get_delete_when_keyring_available() {
        // Headless CI machines usually have no secret service
        let store = KeyringSecureStore::with_service_name("collection-sync-test");
        let key = "sync.hkey.test-7d1c";

        let _ = store.delete_secret(key).await;

        if let Err(e) = store.set_secret(key, b"abc").await {
            println!("Keyring not available ({}), skipping test", e);
            return;
        }

        assert_eq!(store.list_keys().await.unwrap(), vec![key.to_string()]);
        if let Ok(Some(value)) = store.get_secret(key).await {
            assert_eq!(value, b"abc".to_vec());
        }

        store.delete_secret(key).await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }
}
