//! # WebView
//!
//! Managed owner of one native browser instance.
//!
//! Outbound operations become `WebEngine::invoke(instance, method, json)`
//! calls. Inbound notifications arrive through the
//! [`EventRouter`](crate::router::EventRouter), which finds the view by its
//! object id (the instance address at creation):
//!
//! | Tag | Payload | Effect |
//! |-----|---------|--------|
//! | `onNativeLoadProgress` | `{progress}` | client callbacks and [`WebViewEvent`]s |
//! | `onEvaluateJavascriptResult` | `{callbackId, result}` | resolves the parked continuation |
//! | `didReceiveScriptMessage` | `{name, body: {method, args}}` | one-shot script dispatch |
//!
//! ## Lifecycle
//!
//! The view is registered before its address is handed to any native call,
//! so the first inbound event can already find it. [`WebView::destroy`]
//! (or dropping the view) clears the handle, removes its own registry entry,
//! then releases the native instance once. The native side may hand the same
//! address to the next view, so an entry owned by a newer view is never
//! touched. Continuations still waiting on this view are dropped uncalled,
//! and later events for the id are dropped by the router.

use crate::callbacks::{CallbackId, CallbackTable};
use crate::error::{CoreError, Result};
use crate::handle::NativeHandle;
use crate::registry::ObjectRegistry;
use crate::router::{Delivery, NativeEventTarget};
use crate::script::{ScriptBridge, ScriptTarget};
use bridge_traits::web::methods;
use bridge_traits::WebEngine;
use core_runtime::events::{BridgeEvent, EventBus, LifecycleEvent, WebViewEvent};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Continuation waiting for a script evaluation result.
pub type ScriptCallback = Box<dyn FnOnce(Option<String>) + Send>;

/// Inbound tags handled by [`WebView`].
pub mod tags {
    pub const LOAD_PROGRESS: &str = "onNativeLoadProgress";
    pub const EVALUATE_RESULT: &str = "onEvaluateJavascriptResult";
    pub const SCRIPT_MESSAGE: &str = "didReceiveScriptMessage";
}

/// Observer of page load notifications. All methods default to no-ops.
pub trait WebViewClient: Send + Sync {
    fn on_page_started(&self, _object_id: u64) {}

    fn on_load_resource(&self, _object_id: u64) {}

    fn on_page_finished(&self, _object_id: u64) {}

    fn on_progress_changed(&self, _object_id: u64, _progress: i32) {}
}

/// Shared collaborators a view is created with.
#[derive(Clone)]
pub struct WebViewDeps {
    pub engine: Arc<dyn WebEngine>,
    pub registry: Arc<ObjectRegistry<dyn NativeEventTarget>>,
    pub callbacks: Arc<CallbackTable<ScriptCallback>>,
    pub events: EventBus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadUrlPayload<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a HashMap<String, String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadDataPayload<'a> {
    base_url: Option<&'a str>,
    data: &'a str,
    mime_type: Option<&'a str>,
    encoding: Option<&'a str>,
    history_url: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluatePayload<'a> {
    script: &'a str,
    callback_id: CallbackId,
}

struct WebViewShared {
    object_id: u64,
    handle: NativeHandle,
    deps: WebViewDeps,
    scripts: ScriptBridge,
    client: RwLock<Option<Arc<dyn WebViewClient>>>,
    pending: Mutex<HashSet<CallbackId>>,
}

impl WebViewShared {
    /// Send one outbound call. `Ok(false)` when the view is already destroyed.
    fn invoke_native<P: Serialize>(&self, method: &str, payload: &P) -> Result<bool> {
        let instance = self.handle.address();
        if instance == 0 {
            let stale = CoreError::StaleReference(format!("web view {:#x} destroyed", self.object_id));
            warn!(object_id = self.object_id, method, error = %stale, "Ignoring call on destroyed web view");
            return Ok(false);
        }

        let payload = serde_json::to_string(payload)?;
        debug!(object_id = self.object_id, method, "Invoking native web view");
        self.deps.engine.invoke(instance, method, &payload)?;
        Ok(true)
    }

    fn emit(&self, event: WebViewEvent) {
        let _ = self.deps.events.emit(BridgeEvent::WebView(event));
    }

    fn client(&self) -> Option<Arc<dyn WebViewClient>> {
        self.client.read().clone()
    }

    fn destroy(self: &Arc<Self>) {
        let target: Arc<dyn NativeEventTarget> = self.clone();
        let released = self.handle.release_with(|instance| {
            self.deps.registry.remove_owned(self.object_id, &target);
            self.deps.engine.release_instance(instance);
        });
        if !released {
            return;
        }

        let abandoned: Vec<CallbackId> = self.pending.lock().drain().collect();
        for callback_id in &abandoned {
            self.deps.callbacks.resolve(*callback_id);
        }
        info!(
            object_id = self.object_id,
            abandoned = abandoned.len(),
            "Web view destroyed"
        );
        let _ = self
            .deps
            .events
            .emit(BridgeEvent::Lifecycle(LifecycleEvent::Released {
                object_id: self.object_id,
            }));
    }

    /// Forget a continuation this view was tracking and hand it back.
    fn take_callback(&self, callback_id: CallbackId) -> Option<ScriptCallback> {
        self.pending.lock().remove(&callback_id);
        self.deps.callbacks.resolve(callback_id)
    }

    fn on_load_progress(&self, payload: &Value) -> Delivery {
        let Some(progress) = payload
            .get("progress")
            .and_then(Value::as_i64)
            .and_then(|p| i32::try_from(p).ok())
        else {
            return Delivery::MalformedPayload;
        };

        let object_id = self.object_id;
        let client = self.client();
        debug!(object_id, progress, "Load progress");

        if progress == 100 {
            if let Some(client) = &client {
                client.on_load_resource(object_id);
                client.on_page_finished(object_id);
            }
            self.emit(WebViewEvent::LoadResource { object_id });
            self.emit(WebViewEvent::PageFinished { object_id });
        }
        if progress == 0 {
            if let Some(client) = &client {
                client.on_page_started(object_id);
            }
            self.emit(WebViewEvent::PageStarted { object_id });
        }
        if let Some(client) = &client {
            client.on_progress_changed(object_id, progress);
        }
        self.emit(WebViewEvent::ProgressChanged {
            object_id,
            progress,
        });

        Delivery::Routed
    }

    fn on_evaluate_result(&self, payload: &Value) -> Delivery {
        let Some(callback_id) = payload.get("callbackId").and_then(CallbackId::from_json) else {
            return Delivery::MalformedPayload;
        };

        let result = match payload.get("result") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let delivered = match self.take_callback(callback_id) {
            Some(callback) => {
                callback(result);
                true
            }
            None => {
                debug!(object_id = self.object_id, %callback_id, "No continuation waiting for script result");
                false
            }
        };

        self.emit(WebViewEvent::ScriptResult {
            object_id: self.object_id,
            callback_id: callback_id.get(),
            delivered,
        });
        Delivery::Routed
    }

    fn on_script_message(&self, payload: &Value) -> Delivery {
        let Some(name) = payload.get("name").and_then(Value::as_str) else {
            return Delivery::MalformedPayload;
        };
        let body = payload.get("body").unwrap_or(&Value::Null);
        let Some(method) = body.get("method").and_then(Value::as_str) else {
            return Delivery::MalformedPayload;
        };
        let args = body
            .get("args")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        match self.scripts.dispatch(name, method, args) {
            Ok(()) => {
                debug!(object_id = self.object_id, interface = name, method, "Script call dispatched");
                self.emit(WebViewEvent::ScriptDispatched {
                    object_id: self.object_id,
                    interface: name.to_string(),
                    method: method.to_string(),
                });
            }
            Err(e) => {
                warn!(object_id = self.object_id, interface = name, method, error = %e, "Script call not dispatched");
                self.emit(WebViewEvent::ScriptDispatchFailed {
                    object_id: self.object_id,
                    interface: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Delivery::Routed
    }
}

impl NativeEventTarget for WebViewShared {
    fn on_native_event(&self, method: &str, payload: &Value) -> Delivery {
        match method {
            tags::LOAD_PROGRESS => self.on_load_progress(payload),
            tags::EVALUATE_RESULT => self.on_evaluate_result(payload),
            tags::SCRIPT_MESSAGE => self.on_script_message(payload),
            _ => Delivery::UnknownMethod,
        }
    }
}

/// Managed handle on a native browser instance.
pub struct WebView {
    shared: Arc<WebViewShared>,
}

impl WebView {
    /// Create a native instance and register the view for inbound events.
    pub fn create(deps: WebViewDeps) -> Result<Self> {
        let address = deps.engine.create_instance()?;
        if address == 0 {
            return Err(CoreError::Transport(
                "web engine returned a null instance".to_string(),
            ));
        }

        let shared = Arc::new(WebViewShared {
            object_id: address,
            handle: NativeHandle::new(address),
            deps,
            scripts: ScriptBridge::new(),
            client: RwLock::new(None),
            pending: Mutex::new(HashSet::new()),
        });

        let target: Arc<dyn NativeEventTarget> = shared.clone();
        shared.deps.registry.insert(address, &target);
        let _ = shared
            .deps
            .events
            .emit(BridgeEvent::Lifecycle(LifecycleEvent::Registered {
                object_id: address,
            }));
        info!(object_id = address, "Web view created");

        Ok(Self { shared })
    }

    /// Id under which inbound events address this view.
    pub fn object_id(&self) -> u64 {
        self.shared.object_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.handle.is_released()
    }

    pub fn set_client(&self, client: Arc<dyn WebViewClient>) {
        *self.shared.client.write() = Some(client);
    }

    pub fn clear_client(&self) {
        *self.shared.client.write() = None;
    }

    pub fn load_url(&self, url: &str, headers: Option<&HashMap<String, String>>) -> Result<()> {
        self.shared
            .invoke_native(methods::LOAD_URL, &LoadUrlPayload { url, headers })?;
        Ok(())
    }

    pub fn load_data_with_base_url(
        &self,
        base_url: Option<&str>,
        data: &str,
        mime_type: Option<&str>,
        encoding: Option<&str>,
        history_url: Option<&str>,
    ) -> Result<()> {
        let payload = LoadDataPayload {
            base_url,
            data,
            mime_type,
            encoding,
            history_url,
        };
        self.shared
            .invoke_native(methods::LOAD_DATA_WITH_BASE_URL, &payload)?;
        Ok(())
    }

    /// Evaluate `script` in the page. `callback` receives the result (or
    /// `None` for a null result) when the native side reports it.
    ///
    /// If the view is already destroyed, or the native call fails, the
    /// continuation is removed again and dropped without being called. The
    /// same happens to a continuation still waiting when the view is
    /// destroyed.
    pub fn evaluate_javascript<F>(&self, script: &str, callback: Option<F>) -> Result<()>
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        let shared = &self.shared;
        let callback_id = shared.deps.callbacks.issue();
        if let Some(callback) = callback {
            shared.deps.callbacks.park(callback_id, Box::new(callback));
            shared.pending.lock().insert(callback_id);
        }

        let sent = shared.invoke_native(
            methods::EVALUATE_JAVASCRIPT,
            &EvaluatePayload {
                script,
                callback_id,
            },
        );

        match sent {
            Ok(true) => Ok(()),
            Ok(false) => {
                shared.take_callback(callback_id);
                Ok(())
            }
            Err(e) => {
                shared.take_callback(callback_id);
                Err(e)
            }
        }
    }

    /// Evaluate `script` without waiting for its result.
    pub fn run_javascript(&self, script: &str) -> Result<()> {
        self.evaluate_javascript(script, None::<fn(Option<String>)>)
    }

    /// [`evaluate_javascript`](Self::evaluate_javascript) with the result
    /// delivered through a oneshot channel. The receiver reports `RecvError`
    /// if the continuation was dropped.
    pub fn evaluate_javascript_async(
        &self,
        script: &str,
    ) -> Result<oneshot::Receiver<Option<String>>> {
        let (tx, rx) = oneshot::channel();
        self.evaluate_javascript(
            script,
            Some(move |result: Option<String>| {
                let _ = tx.send(result);
            }),
        )?;
        Ok(rx)
    }

    /// Bind `target` as `name` and announce the interface to the page.
    ///
    /// The binding serves a single inbound call; re-add it to receive more.
    pub fn add_javascript_interface(
        &self,
        target: Arc<dyn ScriptTarget>,
        name: &str,
    ) -> Result<()> {
        self.shared.scripts.bind(name, target);
        self.shared
            .invoke_native(methods::ADD_JAVASCRIPT_INTERFACE, &json!({ "name": name }))?;
        Ok(())
    }

    /// Drop a local binding. The page is not notified.
    pub fn remove_javascript_interface(&self, name: &str) -> bool {
        self.shared.scripts.unbind(name)
    }

    pub fn has_javascript_interface(&self, name: &str) -> bool {
        self.shared.scripts.is_bound(name)
    }

    /// Release the native instance. Idempotent.
    pub fn destroy(&self) {
        self.shared.destroy();
    }
}

impl Drop for WebView {
    fn drop(&mut self) {
        self.shared.destroy();
    }
}

impl fmt::Debug for WebView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebView")
            .field("object_id", &format_args!("{:#x}", self.shared.object_id))
            .field("handle", &self.shared.handle)
            .field("scripts", &self.shared.scripts)
            .finish()
    }
}
