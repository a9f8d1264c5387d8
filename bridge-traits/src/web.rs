//! Embedded Browser Abstraction
//!
//! The native browser engine is driven through a single generic entry point:
//! every outbound operation is a method name plus a UTF-8 JSON payload.
//! Results and notifications flow back asynchronously through the core's
//! inbound event entry point, addressed by the instance address returned from
//! [`WebEngine::create_instance`].

use crate::error::Result;
use crate::image::NativeAddress;

/// Outbound method names understood by the native browser engine.
pub mod methods {
    pub const LOAD_URL: &str = "loadUrl";
    pub const LOAD_DATA_WITH_BASE_URL: &str = "loadDataWithBaseURL";
    pub const EVALUATE_JAVASCRIPT: &str = "evaluateJavascript";
    pub const ADD_JAVASCRIPT_INTERFACE: &str = "addJavascriptInterface";
}

/// Native browser engine trait
pub trait WebEngine: Send + Sync {
    /// Create a browser instance and return its non-zero address.
    fn create_instance(&self) -> Result<NativeAddress>;

    /// Invoke `method` on an instance with a JSON payload.
    fn invoke(&self, instance: NativeAddress, method: &str, payload_json: &str) -> Result<()>;

    fn release_instance(&self, instance: NativeAddress);
}
