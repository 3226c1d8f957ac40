//! # Host Bridge Traits
//!
//! Contracts between the sync core and the things it does not own.
//!
//! ## Overview
//!
//! The core decides *what* to do during a collection sync; everything that
//! actually touches the network, the collection file or the OS keychain sits
//! behind one of the traits in this crate. Hosts (desktop, mobile) supply
//! concrete implementations; tests supply fakes.
//!
//! ## Traits
//!
//! ### Sync
//! - [`SyncBackend`](remote::SyncBackend) - Login, compare, full transfers, media sync
//! - [`ProgressReporter`](remote::ProgressReporter) - Progress sink for backend calls
//! - [`CollectionStore`](collection::CollectionStore) - Close/reopen/backup of the local collection
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Keystore)
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Mobile   | host-provided       | 📋 Planned |
//!
//! The `SyncBackend` is always host-provided; no implementation ships here.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Backends must
//! report rejected credentials as [`BridgeError::AuthFailed`] so the core can
//! clear the stored login, and network problems as [`BridgeError::Transport`].
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod collection;
pub mod error;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use collection::{BackupOptions, CloseOptions, CollectionStore};
pub use remote::{
    AuthToken, CompareResponse, NoopProgress, ProgressReporter, RemoteProgress, SyncBackend,
};
pub use storage::{SecureStore, SettingsStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
