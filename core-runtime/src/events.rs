//! # Event Bus System
//!
//! Publishes what happens at the native boundary (page loads, script results,
//! native requests, object lifetimes) over `tokio::sync::broadcast` so hosts
//! and tests can observe the bridge without hooking into it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ Event Router ├────────────>│           │   subscribe   ┌────────────┐
//! └──────────────┘             │ EventBus  ├──────────────>│ Subscriber │
//! ┌──────────────┐    emit     │ (broadcast│               └────────────┘
//! │  Net Client  ├────────────>│  channel) │   subscribe   ┌────────────┐
//! └──────────────┘             │           ├──────────────>│ Subscriber │
//!                              └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BridgeEvent, EventBus, WebViewEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(BridgeEvent::WebView(WebViewEvent::PageStarted { object_id: 7 })).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.object_id(), Some(7));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events and may
//!   keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns `SendError`. The bridge ignores it;
//! events are an observation channel, not part of the control flow.

use crate::config::DEFAULT_EVENT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

// ============================================================================
// Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    WebView(WebViewEvent),
    Net(NetEvent),
    Lifecycle(LifecycleEvent),
}

impl BridgeEvent {
    pub fn description(&self) -> &str {
        match self {
            BridgeEvent::WebView(e) => e.description(),
            BridgeEvent::Net(e) => e.description(),
            BridgeEvent::Lifecycle(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            BridgeEvent::Net(NetEvent::TransportFailed { .. }) => EventSeverity::Error,
            BridgeEvent::WebView(WebViewEvent::ScriptDispatchFailed { .. }) => {
                EventSeverity::Warning
            }
            BridgeEvent::Lifecycle(LifecycleEvent::EventDropped { .. }) => EventSeverity::Warning,
            BridgeEvent::WebView(WebViewEvent::PageFinished { .. }) => EventSeverity::Info,
            BridgeEvent::Net(NetEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Native object the event concerns, if any.
    pub fn object_id(&self) -> Option<u64> {
        match self {
            BridgeEvent::WebView(e) => Some(e.object_id()),
            BridgeEvent::Net(_) => None,
            BridgeEvent::Lifecycle(e) => Some(e.object_id()),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Browser Events
// ============================================================================

/// Notifications raised while routing inbound browser events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum WebViewEvent {
    /// Load progress reached 0.
    PageStarted { object_id: u64 },
    /// Load progress reached 100; resources are in.
    LoadResource { object_id: u64 },
    /// Load progress reached 100, after `LoadResource`.
    PageFinished { object_id: u64 },
    /// Every progress notification, including 0 and 100.
    ProgressChanged { object_id: u64, progress: i32 },
    /// A script evaluation result reached its continuation.
    ScriptResult {
        object_id: u64,
        callback_id: u64,
        /// `false` when no continuation was waiting for the id
        delivered: bool,
    },
    /// A script message was routed to a bound interface.
    ScriptDispatched {
        object_id: u64,
        interface: String,
        method: String,
    },
    /// A script message could not be routed.
    ScriptDispatchFailed {
        object_id: u64,
        interface: String,
        reason: String,
    },
}

impl WebViewEvent {
    fn description(&self) -> &str {
        match self {
            WebViewEvent::PageStarted { .. } => "Page load started",
            WebViewEvent::LoadResource { .. } => "Page resources loaded",
            WebViewEvent::PageFinished { .. } => "Page load finished",
            WebViewEvent::ProgressChanged { .. } => "Page load progress changed",
            WebViewEvent::ScriptResult { .. } => "Script evaluation result received",
            WebViewEvent::ScriptDispatched { .. } => "Script message dispatched",
            WebViewEvent::ScriptDispatchFailed { .. } => "Script message dispatch failed",
        }
    }

    fn object_id(&self) -> u64 {
        match self {
            WebViewEvent::PageStarted { object_id }
            | WebViewEvent::LoadResource { object_id }
            | WebViewEvent::PageFinished { object_id }
            | WebViewEvent::ProgressChanged { object_id, .. }
            | WebViewEvent::ScriptResult { object_id, .. }
            | WebViewEvent::ScriptDispatched { object_id, .. }
            | WebViewEvent::ScriptDispatchFailed { object_id, .. } => *object_id,
        }
    }
}

// ============================================================================
// Network Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NetEvent {
    /// The native stack answered with metadata.
    Completed {
        url: String,
        code: u16,
        /// Wall time of the blocking call
        elapsed_ms: u64,
        /// Time reported by the native stack in `x-native-cost`
        native_cost_ms: Option<u64>,
    },
    /// No usable metadata came back.
    TransportFailed { url: String, error: String },
}

impl NetEvent {
    fn description(&self) -> &str {
        match self {
            NetEvent::Completed { .. } => "Native request completed",
            NetEvent::TransportFailed { .. } => "Native request transport failure",
        }
    }
}

// ============================================================================
// Lifecycle Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// A browser instance became reachable for inbound events.
    Registered { object_id: u64 },
    /// The native counterpart was released and the registry entry removed.
    Released { object_id: u64 },
    /// An inbound event found no live object or an unknown tag.
    EventDropped { object_id: u64, method: String },
}

impl LifecycleEvent {
    fn description(&self) -> &str {
        match self {
            LifecycleEvent::Registered { .. } => "Native object registered",
            LifecycleEvent::Released { .. } => "Native object released",
            LifecycleEvent::EventDropped { .. } => "Inbound event dropped",
        }
    }

    fn object_id(&self) -> u64 {
        match self {
            LifecycleEvent::Registered { object_id }
            | LifecycleEvent::Released { object_id }
            | LifecycleEvent::EventDropped { object_id, .. } => *object_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus.
///
/// Cloning shares the underlying channel. Slow subscribers get
/// `RecvError::Lagged` without blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0; `BridgeConfig::validate` rejects that value.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning the number of subscribers reached.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver for future events. Past events are
    /// not replayed.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{BridgeEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let net_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, BridgeEvent::Net(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Events scoped to one native object.
    pub fn for_object(self, object_id: u64) -> Self {
        self.filter(move |event| event.object_id() == Some(object_id))
    }

    fn accepts(&self, event: &BridgeEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<BridgeEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(object_id: u64, progress: i32) -> BridgeEvent {
        BridgeEvent::WebView(WebViewEvent::ProgressChanged {
            object_id,
            progress,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::default();
        assert!(bus.emit(progress(1, 10)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = BridgeEvent::Net(NetEvent::Completed {
            url: "https://example.com".to_string(),
            code: 200,
            elapsed_ms: 12,
            native_cost_ms: Some(9),
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, BridgeEvent::Net(_)));

        bus.emit(progress(3, 50)).ok();
        let failure = BridgeEvent::Net(NetEvent::TransportFailed {
            url: "https://example.com".to_string(),
            error: "native net error".to_string(),
        });
        bus.emit(failure.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), failure);
    }

    #[tokio::test]
    async fn test_event_stream_for_object() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).for_object(2);

        bus.emit(progress(1, 10)).ok();
        bus.emit(progress(2, 20)).ok();

        assert_eq!(stream.try_recv().unwrap().unwrap(), progress(2, 20));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(progress(1, i * 20)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(progress(1, i)).ok();
            }
        });
        let handle2 = tokio::spawn(async move {
            for i in 0..10 {
                bus2.emit(BridgeEvent::Lifecycle(LifecycleEvent::EventDropped {
                    object_id: i,
                    method: "onNativeLoadProgress".to_string(),
                }))
                .ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_severity() {
        let failure = BridgeEvent::Net(NetEvent::TransportFailed {
            url: String::new(),
            error: "boom".to_string(),
        });
        assert_eq!(failure.severity(), EventSeverity::Error);

        let finished = BridgeEvent::WebView(WebViewEvent::PageFinished { object_id: 1 });
        assert_eq!(finished.severity(), EventSeverity::Info);

        assert_eq!(progress(1, 40).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description_and_object() {
        let event = BridgeEvent::Lifecycle(LifecycleEvent::Released { object_id: 0x2a });
        assert_eq!(event.description(), "Native object released");
        assert_eq!(event.object_id(), Some(0x2a));

        let net = BridgeEvent::Net(NetEvent::Completed {
            url: String::new(),
            code: 204,
            elapsed_ms: 0,
            native_cost_ms: None,
        });
        assert_eq!(net.object_id(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = BridgeEvent::WebView(WebViewEvent::ScriptResult {
            object_id: 5,
            callback_id: 3,
            delivered: true,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"WebView\""));
        assert!(json.contains("\"event\":\"ScriptResult\""));

        let decoded: BridgeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
