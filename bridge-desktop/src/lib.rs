//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `CollectionStore` using a WAL-mode SQLite file ([`SqliteCollection`])
//! - `SettingsStore` using a SQLite-backed key-value table ([`SqliteSettingsStore`])
//! - `SecureStore` using the `keyring` crate ([`KeyringSecureStore`])
//! - [`DesktopPaths`] for the conventional on-disk layout
//!
//! The remote `SyncBackend` is not provided here; hosts inject their own.
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopPaths, SqliteCollection, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let paths = DesktopPaths::from_system().unwrap();
//!     let settings = SqliteSettingsStore::new(paths.settings_db()).await.unwrap();
//!     let collection = SqliteCollection::open(paths.collection_db()).await.unwrap();
//! }
//! ```

mod collection;
mod paths;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use collection::SqliteCollection;
pub use paths::DesktopPaths;
pub use settings::SqliteSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
