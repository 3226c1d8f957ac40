//! Classification of a compare request and the shapes a session can end in.

use crate::{Result, SyncError};
use bridge_traits::CompareResponse;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the remote says must happen after comparing collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    NoChanges,
    /// The backend already applied an incremental merge.
    NormalSyncCompleted,
    FullDownloadRequired,
    FullUploadRequired,
    /// Both sides changed incompatibly; the user must choose a direction.
    ConflictRequiresUserChoice,
}

impl SyncOutcome {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SyncOutcome::NoChanges),
            1 => Some(SyncOutcome::NormalSyncCompleted),
            2 => Some(SyncOutcome::ConflictRequiresUserChoice),
            3 => Some(SyncOutcome::FullDownloadRequired),
            4 => Some(SyncOutcome::FullUploadRequired),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            SyncOutcome::NoChanges => 0,
            SyncOutcome::NormalSyncCompleted => 1,
            SyncOutcome::ConflictRequiresUserChoice => 2,
            SyncOutcome::FullDownloadRequired => 3,
            SyncOutcome::FullUploadRequired => 4,
        }
    }

    /// Classify a compare response. Missing or unknown codes are an
    /// [`SyncError::InternalInvariantViolation`].
    pub fn from_response(response: &CompareResponse) -> Result<Self> {
        match response.required {
            Some(code) => Self::from_code(code).ok_or_else(|| {
                SyncError::InternalInvariantViolation(format!(
                    "unrecognized sync outcome code {code}"
                ))
            }),
            None => Err(SyncError::InternalInvariantViolation(
                "compare response carried no sync outcome".to_string(),
            )),
        }
    }
}

/// Caller directive for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Run a normal sync and let the remote decide.
    #[default]
    None,
    ForceDownload,
    ForceUpload,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::None => "none",
            ConflictResolution::ForceDownload => "force_download",
            ConflictResolution::ForceUpload => "force_upload",
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which collection-level path a session took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPath {
    Normal,
    FullDownload,
    FullUpload,
}

impl SyncPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPath::Normal => "normal",
            SyncPath::FullDownload => "full_download",
            SyncPath::FullUpload => "full_upload",
        }
    }
}

impl fmt::Display for SyncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum MediaSyncStatus {
    Completed,
    /// Media sync is switched off.
    Disabled,
    /// Media sync failed under the isolating policy.
    Failed(String),
}

impl MediaSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSyncStatus::Completed => "completed",
            MediaSyncStatus::Disabled => "disabled",
            MediaSyncStatus::Failed(_) => "failed",
        }
    }
}

/// How a session that did not error ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSessionResult {
    Completed {
        path: SyncPath,
        media: MediaSyncStatus,
    },
    /// The remote reported a conflict. Nothing was transferred; call again
    /// with [`ConflictResolution::ForceDownload`] or
    /// [`ConflictResolution::ForceUpload`].
    AwaitingConflictResolution,
}

impl SyncSessionResult {
    pub fn path(&self) -> Option<SyncPath> {
        match self {
            SyncSessionResult::Completed { path, .. } => Some(*path),
            SyncSessionResult::AwaitingConflictResolution => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for code in 0..=4 {
            assert_eq!(SyncOutcome::from_code(code).unwrap().code(), code);
        }
        assert_eq!(
            SyncOutcome::from_code(2),
            Some(SyncOutcome::ConflictRequiresUserChoice)
        );
        assert_eq!(SyncOutcome::from_code(5), None);
        assert_eq!(SyncOutcome::from_code(-1), None);
    }

    #[test]
    fn test_missing_code_is_invariant_violation() {
        let err = SyncOutcome::from_response(&CompareResponse::default()).unwrap_err();
        assert!(matches!(err, SyncError::InternalInvariantViolation(_)));

        let err = SyncOutcome::from_response(&CompareResponse::with_required(42)).unwrap_err();
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_session_result_path() {
        let done = SyncSessionResult::Completed {
            path: SyncPath::FullUpload,
            media: MediaSyncStatus::Failed("disk full".into()),
        };
        assert_eq!(done.path(), Some(SyncPath::FullUpload));
        assert_eq!(SyncSessionResult::AwaitingConflictResolution.path(), None);
        assert_eq!(MediaSyncStatus::Failed("x".into()).as_str(), "failed");
        assert_eq!(ConflictResolution::default(), ConflictResolution::None);
    }
}
