//! # Core Bridge
//!
//! Managed side of the native boundary: objects that own native resources,
//! and the routing that lets the native side call back into them.
//!
//! ## Components
//!
//! - [`NativeHandle`] - opaque native address released exactly once
//! - [`ObjectRegistry`] - object id to live owner, for inbound routing
//! - [`CallbackTable`] - request id to pending one-shot continuation
//! - [`ScriptBridge`] - one-shot interface bindings for script calls
//! - [`NetClient`] - blocking request/response over segmented replies
//! - [`Bitmap`] / [`Canvas`] - image and surface resources
//! - [`WebView`] - native browser instance and its inbound events
//! - [`EventRouter`] - the inbound `deliver_event` entry point
//! - [`CookieBridge`], [`NativeChannel`] - cookie and host notifications
//!
//! [`BridgeContext`] ties them together from a
//! [`BridgeConfig`](core_runtime::config::BridgeConfig).
//!
//! ## Threading
//!
//! Every shared table tolerates concurrent access from application threads
//! and native delivery threads. Blocking net calls must not run on a thread
//! that also delivers inbound events.

pub mod bitmap;
pub mod callbacks;
pub mod channel;
pub mod context;
pub mod cookies;
pub mod error;
pub mod handle;
pub mod net;
pub mod registry;
pub mod router;
pub mod script;
pub mod webview;

pub use bitmap::{normalize_quality, Bitmap, Canvas};
pub use callbacks::{CallbackId, CallbackTable};
pub use channel::NativeChannel;
pub use context::BridgeContext;
pub use cookies::CookieBridge;
pub use error::{CoreError, DispatchError, Result};
pub use handle::NativeHandle;
pub use net::{NetClient, NetResponse, NetStats};
pub use registry::ObjectRegistry;
pub use router::{Delivery, EventRouter, NativeEventTarget};
pub use script::{ScriptBridge, ScriptObject, ScriptTarget};
pub use webview::{ScriptCallback, WebView, WebViewClient};
