//! # Logging & Tracing Infrastructure
//!
//! Structured logging for the bridge crates built on `tracing`:
//! - Pretty, JSON and compact output formats
//! - Per-crate filtering through `EnvFilter`
//! - Redaction helpers for cookies, tokens and authorization headers
//! - Optional mirroring of every event into a host [`LoggerSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(HostLogcat::new()));
//!
//! init_logging(config)?;
//! tracing::info!(object_id = 42, "Browser instance created");
//! ```
//!
//! ## LoggerSink integration
//!
//! When a sink is configured, each event that passes the filter is turned
//! into a [`LogEntry`] carrying the message and all recorded fields. Inside a
//! Tokio runtime the sink call is spawned; elsewhere it runs to completion on
//! the logging thread.

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::{LookupSpan, Registry},
    util::SubscriberInitExt,
    Layer,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum level for the bridge crates
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_bridge=trace,reqwest=debug"),
    /// replaces the default filter entirely
    pub filter: Option<String>,
    /// Optional sink mirroring events to the host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit events
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
            // Events arrive on native threads; thread names help correlate them.
            display_thread_info: true,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("enable_spans", &self.enable_spans)
            .field("display_target", &self.display_target)
            .field("display_thread_info", &self.display_thread_info)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Crates whose events are shown at the configured level by default.
const BRIDGE_CRATES: &[&str] = &[
    "native_bridge_workspace",
    "core_runtime",
    "core_bridge",
    "core_service",
    "bridge_desktop",
];

/// Chatty HTTP internals pulled in by the desktop network engine.
const QUIET_CRATES: &[&str] = &["h2", "hyper", "reqwest"];

/// Initialize the global subscriber
///
/// Call once at startup. A second call fails with [`Error::Logging`] because
/// a global default subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    tracing_subscriber::registry()
        .with(output_layer(&config))
        .with(filter)
        .with(LoggerSinkLayer::new(config.logger_sink.clone()))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(config: &LoggingConfig) -> BoxedLayer {
    let span_events = if config.enable_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };
    let base = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info);

    match config.format {
        LogFormat::Pretty => base.pretty().with_span_events(span_events).boxed(),
        LogFormat::Compact => base.compact().with_span_events(span_events).boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = config.level.as_str();
            BRIDGE_CRATES
                .iter()
                .map(|krate| format!("{}={}", krate, level))
                .chain(QUIET_CRATES.iter().map(|krate| format!("{}=warn", krate)))
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

/// Mirrors events into the host [`LoggerSink`].
///
/// Field values pass through [`redact_if_sensitive`] before they leave the
/// process, so cookies and credentials never reach host logs.
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }

    fn forward(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("host logger rejected entry: {}", e);
                    }
                });
            }
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("host logger rejected entry: {}", e);
                }
            }
        }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let metadata = event.metadata();
        let level = sink_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = fields.values.into_iter().fold(
            LogEntry::new(level, metadata.target(), message),
            |entry, (key, value)| entry.with_field(key, value),
        );
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span_id(span.name());
        }

        Self::forward(Arc::clone(sink), entry);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values
                    .insert(name.to_string(), redact_if_sensitive(name, &value));
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    // Numbers and bools fall back here; their Debug output is their plain value.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}

fn sink_level(level: &tracing::Level) -> LogLevel {
    use tracing::Level;

    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warn
    } else if *level == Level::INFO {
        LogLevel::Info
    } else if *level == Level::DEBUG {
        LogLevel::Debug
    } else {
        LogLevel::Trace
    }
}

/// Name fragments of fields and headers whose values are never logged.
const SENSITIVE_FIELDS: &[&str] = &[
    "cookie",
    "authorization",
    "token",
    "password",
    "secret",
    "api_key",
    "session",
];

const REDACTED: &str = "[REDACTED]";

/// Mask a value whose field or header name looks sensitive
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("Set-Cookie", "sid=42"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("Accept", "*/*"), "*/*");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_ascii_lowercase().replace('-', "_");
    if SENSITIVE_FIELDS.iter().any(|fragment| name.contains(fragment)) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// Copy of a header map with sensitive values masked, suitable for logging.
pub fn redact_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.clone(), redact_if_sensitive(name, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_filter("core_bridge=trace")
            .with_spans(true)
            .with_target(false)
            .with_thread_info(false);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.filter, Some("core_bridge=trace".to_string()));
        assert!(config.enable_spans);
        assert!(!config.display_target);
        assert!(!config.display_thread_info);
    }

    #[test]
    fn test_redact_if_sensitive() {
        assert_eq!(redact_if_sensitive("Cookie", "a=b"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("access_token", "secret123"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("X-Session-Id", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("Content-Type", "text/html"), "text/html");
    }

    #[test]
    fn test_redact_headers_keeps_names() {
        let mut headers = HashMap::new();
        headers.insert("Cookie".to_string(), "sid=1".to_string());
        headers.insert("Referer".to_string(), "https://example.com".to_string());

        let redacted = redact_headers(&headers);
        assert_eq!(redacted.get("Cookie"), Some(&"[REDACTED]".to_string()));
        assert_eq!(
            redacted.get("Referer"),
            Some(&"https://example.com".to_string())
        );
    }

    #[test]
    fn test_default_format() {
        #[cfg(debug_assertions)]
        assert_eq!(LogFormat::default(), LogFormat::Pretty);

        #[cfg(not(debug_assertions))]
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn test_build_filter_covers_bridge_crates() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.contains("core_bridge=debug"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_build_custom_filter() {
        let config = LoggingConfig::default().with_filter("core_bridge=trace");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_bridge=trace"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_bridge=[[[");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_logger_sink_layer_forwards_event() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink)));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::warn!(
            target: "core_bridge::router",
            object_id = 7u64,
            cookie = "sid=1",
            "no live object"
        );

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_bridge::router");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.message, "no live object");
        assert_eq!(entry.fields.get("object_id"), Some(&"7".to_string()));
        assert_eq!(entry.fields.get("cookie"), Some(&"[REDACTED]".to_string()));
    }

    #[test]
    fn test_sink_level_mapping() {
        assert_eq!(sink_level(&tracing::Level::ERROR), LogLevel::Error);
        assert_eq!(sink_level(&tracing::Level::WARN), LogLevel::Warn);
        assert_eq!(sink_level(&tracing::Level::INFO), LogLevel::Info);
        assert_eq!(sink_level(&tracing::Level::DEBUG), LogLevel::Debug);
        assert_eq!(sink_level(&tracing::Level::TRACE), LogLevel::Trace);
    }

    #[test]
    fn test_logger_sink_respects_min_level() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink)));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::debug!("below threshold");

        assert!(sink.entries.lock().unwrap().is_empty());
    }

    #[derive(Default)]
    struct TestLoggerSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Info
        }
    }
}
