//! Integration tests for logging helpers

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_if_sensitive, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_sync_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("hkey", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("HKey", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "pw1"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("client_secret", "s"), "[REDACTED]");
}

#[test]
fn test_email_usernames_are_masked() {
    let redacted = redact_if_sensitive("username", "alice@example.com");
    assert!(redacted.starts_with('a'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_plain_values_pass_through() {
    assert_eq!(redact_if_sensitive("session_id", "5c1e"), "5c1e");
    assert_eq!(redact_if_sensitive("path", "full_download"), "full_download");
    // An '@' without a dotted domain is not treated as an address
    assert_eq!(redact_if_sensitive("stage", "step@2"), "step@2");
}

#[test]
fn test_backup_paths_are_stripped() {
    assert_eq!(
        strip_path("/home/alice/.local/share/collection-sync/backups/backup-2024.db"),
        "backup-2024.db"
    );
    assert_eq!(strip_path("D:\\profiles\\collection.db"), "collection.db");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[test]
fn test_default_format_depends_on_build() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}
