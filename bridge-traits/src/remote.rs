//! Remote Sync Backend Abstractions
//!
//! The remote side of collection sync is opaque to the core: transport,
//! encryption and diffing all live behind [`SyncBackend`]. The core only
//! issues the five protocol calls and reacts to what they return.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Credential issued by a successful login.
///
/// Holds the opaque `hkey` plus the server endpoint the account is bound to
/// (if the remote redirected it). The `Debug` impl never prints the hkey.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    hkey: String,
    endpoint: Option<String>,
}

impl AuthToken {
    pub fn new(hkey: impl Into<String>) -> Self {
        Self {
            hkey: hkey.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn hkey(&self) -> &str {
        &self.hkey
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("hkey", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Raw result of a "compare collections" request.
///
/// `required` is the backend's change classification code. It is left
/// uninterpreted here; the sync coordinator maps it to an outcome and treats
/// unknown or missing codes as a broken invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub required: Option<i32>,
    pub server_message: Option<String>,
    pub new_endpoint: Option<String>,
}

impl CompareResponse {
    pub fn with_required(code: i32) -> Self {
        Self {
            required: Some(code),
            ..Default::default()
        }
    }
}

/// Progress snapshot emitted by the backend while a remote call runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteProgress {
    /// Incremental merge progress.
    Normal {
        stage: String,
        local_changes: u32,
        remote_changes: u32,
    },
    /// Full upload or download byte counts.
    Transfer { transferred: u64, total: u64 },
    /// Media sync counters.
    Media {
        added: u32,
        removed: u32,
        checked: u32,
    },
    /// No structured payload, just "working".
    Busy,
}

impl RemoteProgress {
    /// Fraction complete for transfers with a known total.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            RemoteProgress::Transfer { transferred, total } if *total > 0 => {
                Some((*transferred as f64 / *total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

/// Receives progress from a backend call.
///
/// Called from whatever task drives the remote call, so implementations must
/// be cheap and must not block.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: RemoteProgress);
}

/// Reporter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _progress: RemoteProgress) {}
}

/// Remote collection sync backend.
///
/// Every call may fail with [`BridgeError::AuthFailed`](crate::BridgeError::AuthFailed)
/// when the hkey or credentials are rejected, or with
/// [`BridgeError::Transport`](crate::BridgeError::Transport) for network and
/// protocol errors.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::remote::{SyncBackend, NoopProgress};
/// use std::sync::Arc;
///
/// async fn check(backend: &dyn SyncBackend, token: &AuthToken) -> Result<()> {
///     let response = backend
///         .compare_collections(token, Arc::new(NoopProgress))
///         .await?;
///     println!("required: {:?}", response.required);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Exchange a username and password for an [`AuthToken`].
    async fn login(
        &self,
        username: &str,
        password: &str,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<AuthToken>;

    /// Compare local and remote collections, applying an incremental merge
    /// when one is possible.
    async fn compare_collections(
        &self,
        token: &AuthToken,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<CompareResponse>;

    /// Replace the local collection with the remote one.
    async fn full_download(
        &self,
        token: &AuthToken,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<()>;

    /// Replace the remote collection with the local one.
    async fn full_upload(
        &self,
        token: &AuthToken,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<()>;

    /// Sync media files.
    async fn sync_media(
        &self,
        token: &AuthToken,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<()>;

    /// Ask the backend to stop any in-flight request.
    async fn abort(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_debug_redacts_hkey() {
        let token = AuthToken::new("secret-hkey").with_endpoint("https://sync.example.net/");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret-hkey"));
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("sync.example.net"));
        assert_eq!(token.hkey(), "secret-hkey");
    }

    #[test]
    fn test_progress_serialization_tag() {
        let progress = RemoteProgress::Transfer {
            transferred: 10,
            total: 40,
        };
        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains("\"kind\":\"transfer\""));
        assert_eq!(progress.fraction(), Some(0.25));
    }

    #[test]
    fn test_fraction_without_total() {
        assert_eq!(
            RemoteProgress::Transfer {
                transferred: 5,
                total: 0
            }
            .fraction(),
            None
        );
        assert_eq!(RemoteProgress::Busy.fraction(), None);
    }
}
