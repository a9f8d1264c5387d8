//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_logging_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).unwrap();
    tracing::info!(object_id = 1u64, "logging installed");

    // The global subscriber is already set
    assert!(matches!(init_logging(config), Err(Error::Logging(_))));
}

#[test]
fn test_redaction_cookie_and_auth() {
    assert_eq!(redact_if_sensitive("Cookie", "sid=1; theme=dark"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("set-cookie", "sid=1"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Proxy-Authorization", "Basic abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("refresh_token", "r-123"), "[REDACTED]");
}

#[test]
fn test_redaction_normal_values() {
    assert_eq!(redact_if_sensitive("url", "https://example.com"), "https://example.com");
    assert_eq!(redact_if_sensitive("x-native-cost", "12"), "12");
    assert_eq!(redact_if_sensitive("content-type", "image/png"), "image/png");
}

#[test]
fn test_filter_configuration() {
    let config = LoggingConfig::default().with_filter("core_bridge=debug,bridge_desktop=trace");

    assert_eq!(
        config.filter,
        Some("core_bridge=debug,bridge_desktop=trace".to_string())
    );
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert!(config.logger_sink.is_none());
}
