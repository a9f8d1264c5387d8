//! # Inbound Event Router
//!
//! Entry point for events the native side delivers asynchronously, addressed
//! by object id and a method tag with a JSON payload.
//!
//! ```text
//! native thread ──deliver_event(id, tag, json)──> registry lookup ──> target
//!                                                      │
//!                                              miss: logged drop
//! ```
//!
//! Nothing here raises: unknown objects, unknown tags, malformed payloads and
//! panicking targets all become a [`Delivery`] value plus a diagnostic.

use crate::registry::ObjectRegistry;
use crate::script::panic_message;
use core_runtime::events::{BridgeEvent, EventBus, LifecycleEvent};
use serde_json::{Map, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Managed object that accepts inbound native events.
pub trait NativeEventTarget: Send + Sync {
    /// Handle one event. `payload` is always a parsed JSON value; an empty
    /// payload string arrives as an empty object.
    fn on_native_event(&self, method: &str, payload: &Value) -> Delivery;
}

/// Outcome of routing one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Routed,
    /// No live object is registered under the id.
    UnknownObject,
    /// The object does not handle the tag.
    UnknownMethod,
    /// The payload was not valid JSON or lacked required fields.
    MalformedPayload,
    /// The target panicked while handling the event.
    Panicked,
}

impl Delivery {
    pub fn is_routed(self) -> bool {
        self == Delivery::Routed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Delivery::Routed => "routed",
            Delivery::UnknownObject => "unknown_object",
            Delivery::UnknownMethod => "unknown_method",
            Delivery::MalformedPayload => "malformed_payload",
            Delivery::Panicked => "panicked",
        }
    }
}

pub struct EventRouter {
    registry: Arc<ObjectRegistry<dyn NativeEventTarget>>,
    events: EventBus,
}

impl EventRouter {
    pub fn new(registry: Arc<ObjectRegistry<dyn NativeEventTarget>>, events: EventBus) -> Self {
        Self { registry, events }
    }

    pub fn registry(&self) -> &Arc<ObjectRegistry<dyn NativeEventTarget>> {
        &self.registry
    }

    /// Route one inbound event to the object registered under `object_id`.
    ///
    /// Events for one id are handled in the order they are delivered; no
    /// ordering holds across ids.
    pub fn deliver_event(&self, object_id: u64, method: &str, payload: &str) -> Delivery {
        trace!(object_id, method, payload_len = payload.len(), "Inbound native event");

        let Some(target) = self.registry.lookup(object_id) else {
            debug!(object_id, method, "No live object for inbound event; dropping");
            self.dropped(object_id, method);
            return Delivery::UnknownObject;
        };

        let payload = match parse_payload(payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(object_id, method, error = %e, "Malformed inbound payload; dropping");
                self.dropped(object_id, method);
                return Delivery::MalformedPayload;
            }
        };

        let delivery = match catch_unwind(AssertUnwindSafe(|| {
            target.on_native_event(method, &payload)
        })) {
            Ok(delivery) => delivery,
            Err(panic) => {
                error!(
                    object_id,
                    method,
                    reason = %panic_message(panic.as_ref()),
                    "Inbound event handler panicked"
                );
                Delivery::Panicked
            }
        };

        match delivery {
            Delivery::Routed => {}
            Delivery::UnknownMethod => {
                warn!(object_id, method, "Unhandled inbound method; ignoring");
                self.dropped(object_id, method);
            }
            other => {
                debug!(object_id, method, outcome = other.as_str(), "Inbound event not handled");
                self.dropped(object_id, method);
            }
        }
        delivery
    }

    fn dropped(&self, object_id: u64, method: &str) {
        let _ = self
            .events
            .emit(BridgeEvent::Lifecycle(LifecycleEvent::EventDropped {
                object_id,
                method: method.to_string(),
            }));
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("registry", &self.registry)
            .finish()
    }
}

fn parse_payload(payload: &str) -> serde_json::Result<Value> {
    if payload.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(payload)
}
