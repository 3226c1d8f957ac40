//! Errors raised while assembling the runtime: configuration, bridge
//! wiring and logging setup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is missing or out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not injected.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The tracing subscriber could not be installed or the filter directive
    /// did not parse.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_message_names_the_bridge() {
        let err = Error::CapabilityMissing {
            capability: "SyncBackend".into(),
            message: "inject one".into(),
        };
        assert_eq!(err.to_string(), "Capability missing: SyncBackend - inject one");
    }
}
