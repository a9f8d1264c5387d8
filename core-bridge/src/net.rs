//! # Native Net Client
//!
//! Synchronous request/response over the native network stack.
//!
//! A request is serialized to JSON and handed to
//! [`NetEngine::call`] together with the optional raw body. The reply is a
//! list of byte segments:
//!
//! | Segment | Content |
//! |---------|---------|
//! | 0 | UTF-8 JSON [`NetResponseMeta`] |
//! | 1 | raw body bytes (optional) |
//!
//! An empty or missing segment 0 means the native stack never produced a
//! response. That, and unreadable metadata, become a synthetic response with
//! code [`TRANSPORT_FAILURE_CODE`]; runtime failures are data, not `Err`.
//! The only `Err` from [`NetClient::call`] is a rejected request.
//!
//! The call blocks for its whole duration. Do not issue it from a thread that
//! also services inbound event delivery.

use crate::error::{CoreError, Result};
use bridge_traits::net::NATIVE_COST_HEADER;
use bridge_traits::{Clock, NetEngine, NetRequest, NetResponseMeta, SystemClock};
use bytes::Bytes;
use core_runtime::events::{BridgeEvent, EventBus, NetEvent};
use core_runtime::logging::redact_headers;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, warn};

/// Status code of a response synthesized for a transport failure.
pub const TRANSPORT_FAILURE_CODE: u16 = 500;

/// Error text of a response synthesized for a missing metadata segment.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "native net error";

/// Response returned by the native network stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetResponse {
    pub code: u16,
    pub message: Option<String>,
    pub error: Option<String>,
    pub headers: HashMap<String, String>,
    pub content_length: Option<i64>,
    /// Final URL after redirects, when it differs from the requested one
    pub current_url: Option<String>,
    pub body: Option<Bytes>,
}

impl NetResponse {
    /// Synthetic response for a call that produced no usable metadata.
    pub fn transport_failure(error: impl Into<String>) -> Self {
        Self {
            code: TRANSPORT_FAILURE_CODE,
            message: None,
            error: Some(error.into()),
            headers: HashMap::new(),
            content_length: None,
            current_url: None,
            body: None,
        }
    }

    fn from_meta(meta: NetResponseMeta, body: Option<Bytes>) -> Self {
        Self {
            code: meta.code,
            message: meta.message,
            error: meta.error,
            headers: meta.headers,
            content_length: meta.content_length,
            current_url: meta.current_url,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code) && self.error.is_none()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Time the native stack spent on the request, from `x-native-cost`.
    pub fn native_cost(&self) -> Option<Duration> {
        self.header(NATIVE_COST_HEADER)?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_millis)
    }

    pub fn redirected_to(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Body bytes, empty when there was no body segment.
    pub fn bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.bytes()).into_owned()
    }

    /// Turn a response that carries an error into [`CoreError::Transport`].
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(error) => Err(CoreError::Transport(format!("{} ({})", error, self.code))),
            None => Ok(self),
        }
    }
}

/// Snapshot of client counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStats {
    pub calls: u64,
    pub transport_failures: u64,
    /// Sum of wall time spent blocked in native calls
    pub total_elapsed_ms: u64,
    /// Sum of `x-native-cost` values reported by the native stack
    pub total_native_ms: u64,
}

#[derive(Default)]
struct NetCounters {
    calls: AtomicU64,
    transport_failures: AtomicU64,
    total_elapsed_ms: AtomicU64,
    total_native_ms: AtomicU64,
}

impl NetCounters {
    fn snapshot(&self) -> NetStats {
        NetStats {
            calls: self.calls.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            total_elapsed_ms: self.total_elapsed_ms.load(Ordering::Relaxed),
            total_native_ms: self.total_native_ms.load(Ordering::Relaxed),
        }
    }
}

/// Blocking client over a [`NetEngine`].
pub struct NetClient {
    engine: Arc<dyn NetEngine>,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
    log_payloads: bool,
    counters: NetCounters,
}

impl NetClient {
    pub fn new(engine: Arc<dyn NetEngine>) -> Self {
        Self {
            engine,
            clock: Arc::new(SystemClock),
            events: None,
            log_payloads: false,
            counters: NetCounters::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish a [`NetEvent`] per call.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Log redacted headers and payload sizes at debug level.
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    pub fn stats(&self) -> NetStats {
        self.counters.snapshot()
    }

    /// Perform a request, blocking until the native stack answers.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] for an empty URL and
    /// [`CoreError::Bridge`] if the request cannot be serialized. Everything
    /// that happens after the request crossed the boundary is reported inside
    /// the returned [`NetResponse`].
    pub fn call(&self, request: &NetRequest) -> Result<NetResponse> {
        if request.url.trim().is_empty() {
            return Err(CoreError::Validation("request URL is empty".to_string()));
        }

        let span = info_span!("native_net", method = request.method.as_str(), url = %request.url);
        let _enter = span.enter();

        let json = request.to_json()?;
        if self.log_payloads {
            debug!(
                headers = ?redact_headers(&request.headers),
                body_len = request.body.as_ref().map_or(0, Bytes::len),
                "Outgoing native request"
            );
        }

        let started = self.clock.unix_timestamp_millis();
        let segments = self.engine.call(&json, request.body.as_deref());
        let elapsed_ms =
            u64::try_from(self.clock.unix_timestamp_millis() - started).unwrap_or_default();

        let (response, transport_failed) = match Self::decode(segments) {
            Ok(response) => (response, false),
            Err(failure) => (failure, true),
        };
        self.record(request, &response, transport_failed, elapsed_ms);
        Ok(response)
    }

    /// Convenience for a plain `GET`.
    pub fn get(&self, url: impl Into<String>) -> Result<NetResponse> {
        self.call(&NetRequest::get(url))
    }

    /// `Err` carries the synthesized transport failure.
    fn decode(segments: Vec<Bytes>) -> std::result::Result<NetResponse, NetResponse> {
        let mut segments = segments.into_iter();

        let meta = match segments.next() {
            Some(meta) if !meta.is_empty() => meta,
            _ => return Err(NetResponse::transport_failure(TRANSPORT_FAILURE_MESSAGE)),
        };

        serde_json::from_slice::<NetResponseMeta>(&meta)
            .map(|meta| NetResponse::from_meta(meta, segments.next()))
            .map_err(|e| {
                NetResponse::transport_failure(format!("malformed response metadata: {}", e))
            })
    }

    fn record(
        &self,
        request: &NetRequest,
        response: &NetResponse,
        transport_failed: bool,
        elapsed_ms: u64,
    ) {
        let native_cost_ms = response
            .native_cost()
            .map(|cost| u64::try_from(cost.as_millis()).unwrap_or(u64::MAX));

        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        self.counters
            .total_elapsed_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
        if let Some(cost) = native_cost_ms {
            self.counters
                .total_native_ms
                .fetch_add(cost, Ordering::Relaxed);
        }

        let event = if transport_failed {
            self.counters
                .transport_failures
                .fetch_add(1, Ordering::Relaxed);
            let error = response.error.clone().unwrap_or_default();
            warn!(%error, elapsed_ms, "Native request produced no response");
            NetEvent::TransportFailed {
                url: request.url.clone(),
                error,
            }
        } else {
            debug!(
                code = response.code,
                elapsed_ms,
                native_cost_ms,
                body_len = response.bytes().len(),
                redirected_to = response.redirected_to(),
                "Native request completed"
            );
            if self.log_payloads {
                debug!(headers = ?redact_headers(&response.headers), "Response headers");
            }
            NetEvent::Completed {
                url: request.url.clone(),
                code: response.code,
                elapsed_ms,
                native_cost_ms,
            }
        };

        if let Some(events) = &self.events {
            // No subscribers is fine.
            let _ = events.emit(BridgeEvent::Net(event));
        }
    }
}

impl fmt::Debug for NetClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetClient")
            .field("log_payloads", &self.log_payloads)
            .field("stats", &self.stats())
            .finish()
    }
}
