//! Workspace façade crate.
//!
//! Host applications depend on `collection-sync` and enable the documented
//! features instead of wiring each workspace crate individually. With the
//! default `desktop-shims` feature the full service API is re-exported.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
