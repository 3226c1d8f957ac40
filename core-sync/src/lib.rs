//! # Collection Sync
//!
//! Orchestrates syncing the local collection with a remote sync backend.
//!
//! ## Components
//!
//! - **Coordinator** (`coordinator`): runs a session down the normal, full
//!   download, full upload or conflict path, then media sync
//! - **Outcome** (`outcome`): classification of the remote's compare result
//!   and the caller's conflict directive
//! - **Guard** (`guard`): closes the collection for a full transfer and
//!   guarantees it is reopened
//! - **Session** (`session`): per-session record with validated transitions
//! - **Progress** (`progress`): relays backend progress onto the event bus

pub mod coordinator;
pub mod error;
pub mod guard;
pub mod outcome;
pub mod progress;
pub mod session;

pub use coordinator::{SyncConfig, SyncCoordinator, SyncHandle};
pub use error::{Result, SyncError};
pub use guard::CollectionGuard;
pub use outcome::{ConflictResolution, MediaSyncStatus, SyncOutcome, SyncPath, SyncSessionResult};
pub use progress::SessionProgress;
pub use session::{SessionStatus, SyncSession, SyncSessionId};
