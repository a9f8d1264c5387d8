//! # Script Bridge
//!
//! Lets scripts running inside the native browser call into managed objects
//! by interface name.
//!
//! A bound object exposes an explicit set of named operations
//! ([`ScriptTarget`]); nothing is discovered by introspection. Bindings are
//! one-shot: a dispatch removes the binding before the method is even looked
//! up, so each registration serves at most one inbound call.
//!
//! ```
//! use core_bridge::script::{ScriptBridge, ScriptObject};
//! use core_bridge::DispatchError;
//! use std::sync::Arc;
//!
//! let bridge = ScriptBridge::new();
//! bridge.bind("app", Arc::new(ScriptObject::new().method("ping", |_args| Ok(()))));
//!
//! assert!(bridge.dispatch("app", "ping", &[]).is_ok());
//! assert_eq!(
//!     bridge.dispatch("app", "ping", &[]),
//!     Err(DispatchError::UnknownInterface("app".to_string()))
//! );
//! ```

use crate::error::DispatchError;
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a single script-invoked operation. The error string is
/// reported as the invocation failure reason.
pub type InvokeResult = std::result::Result<(), String>;

/// An object whose operations scripts may call.
pub trait ScriptTarget: Send + Sync {
    fn has_method(&self, method: &str) -> bool;

    /// Invoke `method` with positional JSON arguments.
    ///
    /// Only called after [`has_method`](Self::has_method) returned `true`.
    fn invoke(&self, method: &str, args: &[Value]) -> InvokeResult;
}

type Operation = Box<dyn Fn(&[Value]) -> InvokeResult + Send + Sync>;

/// [`ScriptTarget`] assembled from closures.
#[derive(Default)]
pub struct ScriptObject {
    operations: HashMap<String, Operation>,
}

impl ScriptObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `operation` under `name`, replacing an earlier one.
    pub fn method<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Box::new(operation));
        self
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl ScriptTarget for ScriptObject {
    fn has_method(&self, method: &str) -> bool {
        self.operations.contains_key(method)
    }

    fn invoke(&self, method: &str, args: &[Value]) -> InvokeResult {
        match self.operations.get(method) {
            Some(operation) => operation(args),
            None => Err(format!("no operation named '{}'", method)),
        }
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.method_names().collect();
        names.sort_unstable();
        f.debug_struct("ScriptObject")
            .field("methods", &names)
            .finish()
    }
}

/// Per-owner table of interface name to bound target.
#[derive(Default)]
pub struct ScriptBridge {
    bindings: Mutex<HashMap<String, Arc<dyn ScriptTarget>>>,
}

impl ScriptBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `target` as `name`. Returns the binding it replaced.
    pub fn bind(
        &self,
        name: impl Into<String>,
        target: Arc<dyn ScriptTarget>,
    ) -> Option<Arc<dyn ScriptTarget>> {
        self.bindings.lock().insert(name.into(), target)
    }

    pub fn unbind(&self, name: &str) -> bool {
        self.bindings.lock().remove(name).is_some()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Route one inbound call, consuming the binding.
    ///
    /// Panics raised by the target are caught and reported as
    /// [`DispatchError::InvocationFailed`].
    pub fn dispatch(
        &self,
        name: &str,
        method: &str,
        args: &[Value],
    ) -> Result<(), DispatchError> {
        let target = self
            .bindings
            .lock()
            .remove(name)
            .ok_or_else(|| DispatchError::UnknownInterface(name.to_string()))?;

        if !target.has_method(method) {
            return Err(DispatchError::UnknownMethod {
                interface: name.to_string(),
                method: method.to_string(),
            });
        }

        debug!(interface = name, method, args = args.len(), "Dispatching script call");

        let outcome = catch_unwind(AssertUnwindSafe(|| target.invoke(method, args)));
        let failure = |reason: String| DispatchError::InvocationFailed {
            interface: name.to_string(),
            method: method.to_string(),
            reason,
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(failure(reason)),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(interface = name, method, %reason, "Script target panicked");
                Err(failure(reason))
            }
        }
    }
}

impl fmt::Debug for ScriptBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.bindings.lock().keys().cloned().collect();
        names.sort_unstable();
        f.debug_struct("ScriptBridge")
            .field("bindings", &names)
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
