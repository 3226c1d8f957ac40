//! # Core Auth
//!
//! Login and persisted login state for the sync core.
//!
//! - [`LoginManager`] exchanges a username/password for an hkey via the
//!   [`bridge_traits::SyncBackend`] and stores it.
//! - [`CredentialStore`] keeps the username in settings and the hkey in the
//!   platform secure store.
//!
//! A logged-out state is the pair `("", "")`. The remote rejecting a login
//! or a later sync resets the store to that pair.

pub mod credential_store;
pub mod error;
pub mod manager;
pub mod types;

#[cfg(test)]
mod test_support;

pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use manager::LoginManager;
pub use types::{AuthToken, LoginCredentials, LoginState};
