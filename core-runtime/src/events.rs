//! # Event Bus System
//!
//! Typed event broadcasting over `tokio::sync::broadcast`. This is the only
//! channel through which the core talks to a UI: login state changes, sync
//! progress snapshots, server messages, conflict prompts and terminal status
//! all arrive as [`CoreEvent`]s.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ LoginManager ├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ UI / host  │
//! ┌──────────────┐     emit      │ (broadcast│                  └────────────┘
//! │ Coordinator  ├──────────────>│  channel) │     subscribe    ┌────────────┐
//! └──────────────┘               │           ├─────────────────>│ Logger     │
//!                                └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus, EventStream};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut auth_only = EventStream::new(event_bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Auth(_)));
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::LoggedIn {
//!         username: "alice".to_string(),
//!     }))
//!     .ok();
//!
//! let event = auth_only.recv().await.unwrap();
//! assert_eq!(event.description(), "Logged in");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Progress
//!   events are frequent during transfers, so UIs should treat this as
//!   non-fatal and keep reading.
//! - **`RecvError::Closed`**: all senders dropped; shut down.
//!
//! Emitting with no subscribers returns an error. Emitters in the core ignore
//! it (`.ok()`), since having no UI attached is normal.

use bridge_traits::RemoteProgress;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Login state changes
    Auth(AuthEvent),
    /// Sync session lifecycle and progress
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::CredentialsCleared { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::MediaSyncFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::ConflictDetected { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::LoggedIn { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::ServerMessage { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Whether the event ends a sync session.
    pub fn is_terminal_sync_event(&self) -> bool {
        matches!(
            self,
            CoreEvent::Sync(
                SyncEvent::Completed { .. }
                    | SyncEvent::Failed { .. }
                    | SyncEvent::Cancelled { .. }
                    | SyncEvent::ConflictDetected { .. }
            )
        )
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to login and the persisted login state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A login request was sent to the remote.
    LoggingIn { username: String },
    /// Login succeeded and the login state was persisted.
    LoggedIn { username: String },
    /// The user logged out.
    LoggedOut { username: String },
    /// The stored login was wiped because the remote rejected it.
    CredentialsCleared {
        /// Why the credentials were cleared.
        reason: String,
    },
    /// Login failed.
    AuthError {
        message: String,
        /// False when the credentials themselves were rejected.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::LoggingIn { .. } => "Logging in",
            AuthEvent::LoggedIn { .. } => "Logged in",
            AuthEvent::LoggedOut { .. } => "Logged out",
            AuthEvent::CredentialsCleared { .. } => "Stored credentials cleared",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted over the life of one sync session.
///
/// Every session starts with `Started` and ends with exactly one of
/// `Completed`, `ConflictDetected`, `Failed` or `Cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Session initiated.
    Started {
        session_id: String,
        /// Caller directive: "none", "force_download" or "force_upload".
        directive: String,
    },
    /// Progress from the remote call currently running.
    Progress {
        session_id: String,
        /// "normal", "full_download", "full_upload", "media".
        phase: String,
        progress: RemoteProgress,
    },
    /// Message from the server that should be shown to the user.
    ServerMessage { session_id: String, message: String },
    /// Collection-level sync finished; media sync may still follow.
    CollectionSynced {
        session_id: String,
        /// "normal", "full_download" or "full_upload".
        path: String,
    },
    /// Local and remote diverged; the user must pick a direction.
    ConflictDetected { session_id: String },
    MediaSyncStarted { session_id: String },
    MediaSyncCompleted { session_id: String },
    /// Media sync failed. The collection sync is kept.
    MediaSyncFailed { session_id: String, message: String },
    /// Session finished successfully.
    Completed {
        session_id: String,
        path: String,
        /// "completed", "disabled" or "failed".
        media: String,
        duration_ms: u64,
    },
    /// Session stopped with an error.
    Failed {
        session_id: String,
        message: String,
        recoverable: bool,
    },
    /// Session was cancelled by the caller.
    Cancelled { session_id: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::ServerMessage { .. } => "Message from sync server",
            SyncEvent::CollectionSynced { .. } => "Collection synced",
            SyncEvent::ConflictDetected { .. } => "Sync conflict requires a decision",
            SyncEvent::MediaSyncStarted { .. } => "Media sync started",
            SyncEvent::MediaSyncCompleted { .. } => "Media sync completed",
            SyncEvent::MediaSyncFailed { .. } => "Media sync failed",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
        }
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            SyncEvent::Started { session_id, .. }
            | SyncEvent::Progress { session_id, .. }
            | SyncEvent::ServerMessage { session_id, .. }
            | SyncEvent::CollectionSynced { session_id, .. }
            | SyncEvent::ConflictDetected { session_id }
            | SyncEvent::MediaSyncStarted { session_id }
            | SyncEvent::MediaSyncCompleted { session_id }
            | SyncEvent::MediaSyncFailed { session_id, .. }
            | SyncEvent::Completed { session_id, .. }
            | SyncEvent::Failed { session_id, .. }
            | SyncEvent::Cancelled { session_id } => session_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another producer for the same channel; each
/// `subscribe()` creates an independent receiver that only sees events
/// emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every matching event currently buffered.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
