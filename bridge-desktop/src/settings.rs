//! Settings Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::path::PathBuf;
use tracing::{debug, error};

const CREATE_SETTINGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        value_type TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed settings store.
///
/// Values are stored as text together with a type tag; reading a key back with
/// a different type is an error rather than a silent coercion. Holds the
/// non-secret half of the login state (username, sync endpoint) and host
/// preferences such as whether media sync is enabled.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open (or create) the settings database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // SQLite URLs want forward slashes even on Windows
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let db_url = format!("sqlite://{}?mode=rwc", path_str);

        let store = Self::connect(&db_url).await?;
        debug!(path = ?db_path, "Initialized settings store");
        Ok(store)
    }

    /// Create an in-memory settings store (for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn connect(db_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(db_url)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        sqlx::query(CREATE_SETTINGS_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;

        Ok(Self { pool })
    }

    async fn set_value(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, value_type, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                value_type = excluded.value_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to set setting: {}", e)))?;

        debug!(key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, value_type FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to get setting: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.get(0);
        let value_type: String = row.get(1);

        if value_type != expected_type {
            error!(
                key = key,
                expected = expected_type,
                actual = value_type,
                "Type mismatch"
            );
            return Err(BridgeError::OperationFailed(format!(
                "Type mismatch for '{}': expected {}, got {}",
                key, expected_type, value_type
            )));
        }

        Ok(Some(value))
    }

    async fn get_parsed<T>(&self, key: &str, expected_type: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_value(key, expected_type).await? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| BridgeError::OperationFailed(format!("Parse error for '{}': {}", key, e))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key, "string").await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, &value.to_string(), "bool").await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get_parsed(key, "bool").await
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, &value.to_string(), "i64").await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.get_parsed(key, "i64").await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to delete setting: {}", e))
            })?;

        debug!(key = key, "Deleted setting");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to list keys: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to clear settings: {}", e))
            })?;

        debug!("Cleared all settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_string_round_trip_and_delete() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("sync.username", "alice").await.unwrap();
        assert_eq!(
            store.get_string("sync.username").await.unwrap(),
            Some("alice".to_string())
        );

        store.set_string("sync.username", "").await.unwrap();
        assert_eq!(
            store.get_string("sync.username").await.unwrap(),
            Some(String::new())
        );

        store.delete("sync.username").await.unwrap();
        assert_eq!(store.get_string("sync.username").await.unwrap(), None);
        assert!(!store.has_key("sync.username").await.unwrap());
    }

    #[tokio::test]
    async fn test_typed_values() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_bool("sync.media_enabled", false).await.unwrap();
        assert_eq!(store.get_bool("sync.media_enabled").await.unwrap(), Some(false));

        store.set_i64("sync.last_success", 1_700_000_000).await.unwrap();
        assert_eq!(
            store.get_i64("sync.last_success").await.unwrap(),
            Some(1_700_000_000)
        );
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_bool("flag", true).await.unwrap();

        let err = store.get_string("flag").await.unwrap_err();
        assert!(err.to_string().contains("Type mismatch"));
    }

    #[tokio::test]
    async fn test_list_and_clear() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("b", "2").await.unwrap();
        store.set_string("a", "1").await.unwrap();
        assert_eq!(store.list_keys().await.unwrap(), vec!["a", "b"]);

        store.clear_all().await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.db");

        {
            let store = SqliteSettingsStore::new(path.clone()).await.unwrap();
            store.set_string("sync.endpoint", "https://sync.example.net/").await.unwrap();
        }

        let store = SqliteSettingsStore::new(path).await.unwrap();
        assert_eq!(
            store.get_string("sync.endpoint").await.unwrap(),
            Some("https://sync.example.net/".to_string())
        );
    }
}
