//! Time and Logging Abstractions
//!
//! Injectable time source (used to measure native call latency) and a sink
//! that mirrors structured logs into the host's logging pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Time source trait
///
/// Lets tests pin elapsed-time measurements instead of reading the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    /// Name of the span the event was recorded in
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Logger sink trait
///
/// Receives every log event that survives filtering. Typical hosts forward
/// entries to Logcat, `os_log` or a file. Cookie, token and authorization
/// field values arrive already masked.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Entries below this level are dropped before reaching the sink.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.unix_timestamp_millis() > 0);
    }

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Warn, "core_bridge::net", "transport failure")
            .with_field("url", "https://example.com")
            .with_span_id("net_call");

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.target, "core_bridge::net");
        assert_eq!(
            entry.fields.get("url"),
            Some(&"https://example.com".to_string())
        );
        assert_eq!(entry.span_id, Some("net_call".to_string()));
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Info.as_str(), "info");
    }

    #[test]
    fn test_log_entry_wire_format() {
        let entry = LogEntry::new(LogLevel::Error, "core_bridge::router", "handler panicked")
            .with_field("object_id", "4096");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["level"], "Error");
        assert_eq!(json["target"], "core_bridge::router");
        assert_eq!(json["fields"]["object_id"], "4096");
        assert!(json["span_id"].is_null());
    }
}
