//! # Sync Session Records
//!
//! Every call to the coordinator produces one [`SyncSession`], a small state
//! machine recording what the session did and how it ended.
//!
//! ```text
//! Pending → Running → Completed
//!    │         ├────→ AwaitingUserChoice
//!    │         ├────→ Failed
//!    └─────────┴────→ Cancelled
//! ```

use crate::outcome::{ConflictResolution, MediaSyncStatus, SyncPath};
use crate::{Result, SyncError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncSessionId(Uuid);

impl SyncSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SyncSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    /// The remote reported a conflict and the session ended waiting for the user.
    AwaitingUserChoice,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending | SessionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::AwaitingUserChoice => "awaiting_user_choice",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one sync session.
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSession {
    pub id: SyncSessionId,
    pub directive: ConflictResolution,
    pub status: SessionStatus,
    /// Collection-level path taken, once one was chosen.
    pub path: Option<SyncPath>,
    pub media: Option<MediaSyncStatus>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl SyncSession {
    pub fn new(directive: ConflictResolution) -> Self {
        Self {
            id: SyncSessionId::new(),
            directive,
            status: SessionStatus::Pending,
            path: None,
            media: None,
            error_message: None,
            created_at: now_millis(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(SessionStatus::Running)?;
        self.status = SessionStatus::Running;
        self.started_at = Some(now_millis());
        Ok(self)
    }

    pub fn complete(mut self, path: SyncPath, media: MediaSyncStatus) -> Result<Self> {
        self.validate_transition(SessionStatus::Completed)?;
        self.status = SessionStatus::Completed;
        self.path = Some(path);
        self.media = Some(media);
        self.completed_at = Some(now_millis());
        Ok(self)
    }

    pub fn await_user_choice(mut self) -> Result<Self> {
        self.validate_transition(SessionStatus::AwaitingUserChoice)?;
        self.status = SessionStatus::AwaitingUserChoice;
        self.completed_at = Some(now_millis());
        Ok(self)
    }

    /// `path` is whatever path had been entered before the failure.
    pub fn fail(mut self, error_message: String, path: Option<SyncPath>) -> Result<Self> {
        self.validate_transition(SessionStatus::Failed)?;
        self.status = SessionStatus::Failed;
        self.path = path;
        self.error_message = Some(error_message);
        self.completed_at = Some(now_millis());
        Ok(self)
    }

    pub fn cancel(mut self, path: Option<SyncPath>) -> Result<Self> {
        self.validate_transition(SessionStatus::Cancelled)?;
        self.status = SessionStatus::Cancelled;
        self.path = path;
        self.completed_at = Some(now_millis());
        Ok(self)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start).max(0) as u64),
            _ => None,
        }
    }

    fn validate_transition(&self, to: SessionStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SessionStatus::Pending, SessionStatus::Running)
                | (SessionStatus::Pending, SessionStatus::Cancelled)
                | (SessionStatus::Pending, SessionStatus::Failed)
                | (SessionStatus::Running, SessionStatus::Completed)
                | (SessionStatus::Running, SessionStatus::AwaitingUserChoice)
                | (SessionStatus::Running, SessionStatus::Failed)
                | (SessionStatus::Running, SessionStatus::Cancelled)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self.status, to),
            });
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
