//! In-memory stores shared by the unit tests.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{SecureStore, SettingsStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default, Clone)]
pub struct MemorySecureStore {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemorySecureStore {
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().await.get(key).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.lock().await.is_empty()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.data.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.data.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.data.lock().await.clear();
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemorySettingsStore {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySettingsStore {
    pub async fn get(&self, key: &str) -> Option<String> {
        self.data.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key).await.and_then(|v| v.parse().ok()))
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get(key).await.and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.data.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.data.lock().await.clear();
        Ok(())
    }
}
