//! Collection Store backed by a SQLite file

use async_trait::async_trait;
use bridge_traits::{
    collection::{BackupOptions, CloseOptions, CollectionStore},
    error::{BridgeError, Result},
    time::{Clock, SystemClock},
};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

const BACKUP_PREFIX: &str = "backup-";
const BACKUP_SUFFIX: &str = ".db";
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d-%H.%M.%S%.3f";

/// Desktop [`CollectionStore`] over a single SQLite database file.
///
/// The database runs in WAL mode while open. Closing with `save` checkpoints
/// the WAL back into the main file so a full upload sends everything; closing
/// with `downgrade` leaves the file in rollback-journal mode for older
/// readers. Backups are written with `VACUUM INTO` as timestamped files.
pub struct SqliteCollection {
    path: PathBuf,
    pool: Mutex<Option<SqlitePool>>,
    clock: Arc<dyn Clock>,
    min_backup_interval: Duration,
    max_backups: usize,
}

impl SqliteCollection {
    /// Open (creating if needed) the collection at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let pool = Self::connect(&path).await?;
        info!(path = ?path, "Opened collection");

        Ok(Self {
            path,
            pool: Mutex::new(Some(pool)),
            clock: Arc::new(SystemClock),
            min_backup_interval: Duration::minutes(30),
            max_backups: 8,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Unforced backups are skipped while the newest backup is younger than this.
    pub fn with_min_backup_interval(mut self, interval: Duration) -> Self {
        self.min_backup_interval = interval;
        self
    }

    /// Oldest backups beyond this count are deleted after each new backup.
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    async fn connect(path: &Path) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                BridgeError::DatabaseError(format!(
                    "Failed to open collection {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    async fn verify_integrity(pool: &SqlitePool) -> Result<()> {
        let verdict: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Integrity check failed: {}", e)))?;

        if verdict != "ok" {
            return Err(BridgeError::DatabaseError(format!(
                "Collection failed integrity check: {}",
                verdict
            )));
        }
        Ok(())
    }

    fn backup_file_name(at: DateTime<Utc>) -> String {
        format!(
            "{}{}{}",
            BACKUP_PREFIX,
            at.format(BACKUP_TIME_FORMAT),
            BACKUP_SUFFIX
        )
    }

    fn parse_backup_time(file_name: &str) -> Option<DateTime<Utc>> {
        let stamp = file_name
            .strip_prefix(BACKUP_PREFIX)?
            .strip_suffix(BACKUP_SUFFIX)?;
        NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Backups in `dir`, oldest first.
    async fn list_backups(dir: &Path) -> Result<Vec<(DateTime<Utc>, PathBuf)>> {
        let mut backups = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(backups),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(taken_at) = name.to_str().and_then(Self::parse_backup_time) {
                backups.push((taken_at, entry.path()));
            }
        }

        backups.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(backups)
    }

    async fn prune_backups(dir: &Path, max_backups: usize) -> Result<()> {
        let backups = Self::list_backups(dir).await?;
        let excess = backups.len().saturating_sub(max_backups);

        for (_, path) in backups.into_iter().take(excess) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = ?path, "Pruned old backup"),
                Err(e) => warn!(path = ?path, error = %e, "Failed to prune backup"),
            }
        }
        Ok(())
    }

    async fn write_backup(
        pool: SqlitePool,
        target: PathBuf,
        dir: PathBuf,
        max_backups: usize,
    ) -> Result<PathBuf> {
        // VACUUM INTO refuses to overwrite
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            tokio::fs::remove_file(&target).await?;
        }

        let target_str = target.to_string_lossy().to_string();
        sqlx::query("VACUUM INTO ?")
            .bind(&target_str)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Backup failed: {}", e)))?;

        info!(path = ?target, "Collection backup written");
        Self::prune_backups(&dir, max_backups).await?;
        Ok(target)
    }
}

#[async_trait]
impl CollectionStore for SqliteCollection {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn close(&self, options: CloseOptions) -> Result<()> {
        let mut guard = self.pool.lock().await;
        let Some(pool) = guard.take() else {
            debug!("Collection already closed");
            return Ok(());
        };

        if options.save {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
                .execute(&pool)
                .await
                .map_err(|e| BridgeError::DatabaseError(format!("Checkpoint failed: {}", e)))?;
        }

        if options.downgrade {
            sqlx::query("PRAGMA journal_mode = DELETE")
                .execute(&pool)
                .await
                .map_err(|e| BridgeError::DatabaseError(format!("Downgrade failed: {}", e)))?;
        }

        pool.close().await;
        info!(
            save = options.save,
            downgrade = options.downgrade,
            for_full_sync = options.for_full_sync,
            "Closed collection"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn reopen(&self, after_full_sync: bool) -> Result<()> {
        let mut guard = self.pool.lock().await;
        if guard.is_some() {
            debug!("Collection already open");
            return Ok(());
        }

        let pool = Self::connect(&self.path).await?;
        let verdict = if after_full_sync {
            Self::verify_integrity(&pool).await
        } else {
            Ok(())
        };
        // Stay open even when the check fails so the host can inspect it
        *guard = Some(pool);

        if let Err(e) = &verdict {
            error!(error = %e, "Reopened collection is damaged");
        } else {
            info!(after_full_sync, "Reopened collection");
        }
        verdict
    }

    #[instrument(skip(self), fields(dir = ?backup_dir))]
    async fn create_backup(
        &self,
        backup_dir: &Path,
        options: BackupOptions,
    ) -> Result<Option<PathBuf>> {
        let pool = self
            .pool
            .lock()
            .await
            .clone()
            .ok_or_else(|| BridgeError::OperationFailed("Collection is closed".to_string()))?;

        tokio::fs::create_dir_all(backup_dir).await?;

        let now = self.clock.now();
        if !options.force {
            if let Some((latest, _)) = Self::list_backups(backup_dir).await?.last() {
                if now - *latest < self.min_backup_interval {
                    debug!(latest = %latest, "Recent backup exists, skipping");
                    return Ok(None);
                }
            }
        }

        let target = backup_dir.join(Self::backup_file_name(now));
        let dir = backup_dir.to_path_buf();

        if options.wait_for_completion {
            return Self::write_backup(pool, target, dir, self.max_backups)
                .await
                .map(Some);
        }

        let max_backups = self.max_backups;
        tokio::spawn(async move {
            if let Err(e) = Self::write_backup(pool, target, dir, max_backups).await {
                error!(error = %e, "Background backup failed");
            }
        });
        Ok(None)
    }

    async fn is_open(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    fn path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}
