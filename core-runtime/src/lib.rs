//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the sync core:
//! - Logging and tracing setup ([`logging`])
//! - Configuration with fail-fast bridge validation ([`config`])
//! - The event bus that carries progress and status to observers ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
