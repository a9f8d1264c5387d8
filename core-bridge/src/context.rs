//! # Bridge Context
//!
//! Owns the shared state of one bridge instance: the object registry, the
//! callback table, the event bus and the clients built from
//! [`BridgeConfig`]. Every table lives here rather than in a process-wide
//! static, so independent contexts (one per test, say) never see each
//! other's objects.

use crate::bitmap::Bitmap;
use crate::callbacks::CallbackTable;
use crate::channel::NativeChannel;
use crate::cookies::CookieBridge;
use crate::error::{CoreError, Result};
use crate::net::NetClient;
use crate::registry::ObjectRegistry;
use crate::router::{Delivery, EventRouter, NativeEventTarget};
use crate::webview::{ScriptCallback, WebView, WebViewDeps};
use core_runtime::config::BridgeConfig;
use core_runtime::events::{EventBus, EventStream};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

pub struct BridgeContext {
    config: BridgeConfig,
    events: EventBus,
    registry: Arc<ObjectRegistry<dyn NativeEventTarget>>,
    callbacks: Arc<CallbackTable<ScriptCallback>>,
    router: EventRouter,
    net: Option<NetClient>,
    cookies: CookieBridge,
    channel: NativeChannel,
}

impl BridgeContext {
    /// Build a context from a validated configuration.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let registry: Arc<ObjectRegistry<dyn NativeEventTarget>> =
            Arc::new(ObjectRegistry::new());
        let router = EventRouter::new(Arc::clone(&registry), events.clone());

        let net = config.net_engine.clone().map(|engine| {
            NetClient::new(engine)
                .with_events(events.clone())
                .with_payload_logging(config.features.log_payloads)
        });
        let cookies = CookieBridge::new(
            config.cookie_store.clone(),
            config.features.enable_native_cookie,
        );
        let channel = NativeChannel::new(config.host_channel.clone());

        info!(
            image_engine = config.image_engine.is_some(),
            net_engine = net.is_some(),
            web_engine = config.web_engine.is_some(),
            native_cookie = cookies.is_enabled(),
            "Bridge context initialized"
        );

        Ok(Self {
            config,
            events,
            registry,
            callbacks: Arc::new(CallbackTable::new()),
            router,
            net,
            cookies,
            channel,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Create a browser view backed by the configured web engine.
    pub fn create_web_view(&self) -> Result<WebView> {
        let engine = self.config.require_web_engine()?;
        WebView::create(WebViewDeps {
            engine,
            registry: Arc::clone(&self.registry),
            callbacks: Arc::clone(&self.callbacks),
            events: self.events.clone(),
        })
    }

    pub fn decode_bitmap(&self, bytes: &[u8]) -> Result<Bitmap> {
        Bitmap::decode(self.config.require_image_engine()?, bytes)
    }

    pub fn decode_bitmap_range(&self, data: &[u8], offset: usize, len: usize) -> Result<Bitmap> {
        Bitmap::decode_range(self.config.require_image_engine()?, data, offset, len)
    }

    pub fn decode_bitmap_reader<R: Read>(&self, reader: R) -> Result<Bitmap> {
        Bitmap::decode_reader(self.config.require_image_engine()?, reader)
    }

    pub fn create_bitmap(&self, width: u32, height: u32) -> Result<Bitmap> {
        Bitmap::create(self.config.require_image_engine()?, width, height)
    }

    pub fn net(&self) -> Result<&NetClient> {
        self.net.as_ref().ok_or_else(|| CoreError::CapabilityMissing {
            capability: "NetEngine",
            message: "no native network stack configured".to_string(),
        })
    }

    pub fn cookies(&self) -> &CookieBridge {
        &self.cookies
    }

    pub fn channel(&self) -> &NativeChannel {
        &self.channel
    }

    /// Inbound entry point for native events.
    pub fn deliver_event(&self, object_id: u64, method: &str, payload: &str) -> Delivery {
        self.router.deliver_event(object_id, method, payload)
    }

    pub fn live_objects(&self) -> usize {
        self.registry.live_count()
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.pending()
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("callbacks", &self.callbacks)
            .field("net", &self.net)
            .finish()
    }
}
