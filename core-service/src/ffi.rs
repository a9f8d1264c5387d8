//! C ABI entry point for native hosts.
//!
//! The native side delivers asynchronous notifications by calling
//! [`native_bridge_deliver_event`] from any of its threads. One
//! [`BridgeService`] is installed per process with [`install`] before the
//! first delivery.
//!
//! Return codes:
//!
//! | Code | Meaning |
//! |------|---------|
//! | `0` | routed to a live object |
//! | `1` | dropped (unknown object or tag, malformed input) |
//! | `-1` | no service installed, or the delivery panicked |

use crate::error::{Result, ServiceError};
use crate::BridgeService;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{error, info, warn};

pub const DELIVERY_ROUTED: i32 = 0;
pub const DELIVERY_DROPPED: i32 = 1;
pub const DELIVERY_UNAVAILABLE: i32 = -1;

static SERVICE: OnceLock<BridgeService> = OnceLock::new();

/// Install the process-wide service that receives inbound events.
///
/// # Errors
///
/// [`ServiceError::AlreadyInstalled`] if a service was installed before.
pub fn install(service: BridgeService) -> Result<&'static BridgeService> {
    SERVICE
        .set(service)
        .map_err(|_| ServiceError::AlreadyInstalled)?;
    info!("Bridge service installed for inbound delivery");
    installed().ok_or(ServiceError::AlreadyInstalled)
}

/// The installed service, if any.
pub fn installed() -> Option<&'static BridgeService> {
    SERVICE.get()
}

/// Convert a C string pointer to a `&str`. Returns `None` if null or invalid UTF-8.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Route one native event to the object registered under `object_id`.
///
/// A null `payload` is treated like an empty one.
///
/// # Safety
///
/// `method` must be a valid null-terminated C string. `payload` must be a
/// valid null-terminated C string or null. Both only need to live for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn native_bridge_deliver_event(
    object_id: u64,
    method: *const c_char,
    payload: *const c_char,
) -> i32 {
    let Some(service) = installed() else {
        warn!(object_id, "Inbound event before a service was installed");
        return DELIVERY_UNAVAILABLE;
    };

    let Some(method) = cstr_to_str(method) else {
        warn!(object_id, "Inbound event with a null or non-UTF-8 method");
        return DELIVERY_DROPPED;
    };

    let payload = if payload.is_null() {
        ""
    } else {
        match cstr_to_str(payload) {
            Some(payload) => payload,
            None => {
                warn!(object_id, method, "Inbound payload is not UTF-8");
                return DELIVERY_DROPPED;
            }
        }
    };

    match catch_unwind(AssertUnwindSafe(|| {
        service.deliver_event(object_id, method, payload)
    })) {
        Ok(delivery) if delivery.is_routed() => DELIVERY_ROUTED,
        Ok(_) => DELIVERY_DROPPED,
        Err(_) => {
            error!(object_id, method, "Inbound delivery panicked");
            DELIVERY_UNAVAILABLE
        }
    }
}
