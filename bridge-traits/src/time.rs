//! Clock and host log sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Source of "now" for backup naming and the minimum backup interval.
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// fn backup_name(clock: &dyn Clock) -> String {
///     clock.now().format("backup-%Y-%m-%d-%H.%M.%S.db").to_string()
/// }
/// ```
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One tracing event as handed to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path of the emitting code, e.g. `core_sync::coordinator`.
    pub target: String,
    pub message: String,
    /// Event fields after redaction.
    pub fields: HashMap<String, String>,
    /// Name of the innermost span, such as `full_download`.
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Host logging pipeline (OSLog, Logcat, a desktop log file).
///
/// Entries arrive already redacted when redaction is enabled; hkeys and
/// passwords must still never be written by an implementation on its own.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Entries below this level are dropped before they are built.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_fields() {
        let entry = LogEntry::new(LogLevel::Warn, "core_sync::coordinator", "Media sync failed")
            .with_field("session_id", "3f2a");

        assert_eq!(entry.target, "core_sync::coordinator");
        assert_eq!(entry.fields.get("session_id"), Some(&"3f2a".to_string()));
        assert!(entry.span.is_none());
    }

    #[test]
    fn test_log_level_ordering_and_serde() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Trace < LogLevel::Info);
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
    }
}
