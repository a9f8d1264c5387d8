//! # Bridge Configuration Module
//!
//! Collects the native collaborators and settings the bridge layer runs with.
//!
//! ## Overview
//!
//! [`BridgeConfig`] is assembled through [`BridgeConfigBuilder`] and validated
//! fail-fast. Every collaborator is optional at build time; a component that
//! needs one that was never provided reports
//! [`Error::CapabilityMissing`] when it is used.
//!
//! ## Collaborators (with desktop defaults)
//!
//! - `ImageEngine` - decode/draw/encode (desktop default: `RasterImageEngine`)
//! - `NetEngine` - synchronous HTTP calls (desktop default: `ReqwestNetEngine`)
//! - `CookieStore` - native cookie jar (desktop default: the reqwest jar)
//! - `HostChannel` - topic notifications (desktop default: `TracingChannel`)
//! - `WebEngine` - embedded browser (always host supplied)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder()
//!     .web_engine(Arc::new(MyWebEngine::new()))
//!     .enable_native_cookie(true)
//!     .event_buffer_size(256)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{CookieStore, HostChannel, ImageEngine, NetEngine, WebEngine};
use std::fmt;
use std::sync::Arc;

/// Default buffer size of the event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Largest accepted event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Bridge configuration.
///
/// Use [`BridgeConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    pub image_engine: Option<Arc<dyn ImageEngine>>,
    pub net_engine: Option<Arc<dyn NetEngine>>,
    pub web_engine: Option<Arc<dyn WebEngine>>,
    pub cookie_store: Option<Arc<dyn CookieStore>>,
    pub host_channel: Option<Arc<dyn HostChannel>>,
    pub features: FeatureFlags,
    /// Capacity of the broadcast channel behind the event bus
    pub event_buffer_size: usize,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field(
                "image_engine",
                &self.image_engine.as_ref().map(|_| "ImageEngine { ... }"),
            )
            .field(
                "net_engine",
                &self.net_engine.as_ref().map(|_| "NetEngine { ... }"),
            )
            .field(
                "web_engine",
                &self.web_engine.as_ref().map(|_| "WebEngine { ... }"),
            )
            .field(
                "cookie_store",
                &self.cookie_store.as_ref().map(|_| "CookieStore { ... }"),
            )
            .field(
                "host_channel",
                &self.host_channel.as_ref().map(|_| "HostChannel { ... }"),
            )
            .field("features", &self.features)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Feature flags control optional behavior of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Route cookie reads/writes to the native cookie store (requires a `CookieStore`)
    pub enable_native_cookie: bool,

    /// Log request/response payload sizes and redacted headers at debug level
    pub log_payloads: bool,
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Event buffer size lies in `1..=10_000`
    /// - Native cookies are only enabled together with a cookie store
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_native_cookie && self.cookie_store.is_none() {
            return Err(Error::Config(
                "Native cookies enabled but no CookieStore provided. \
                 Disable the feature or inject a CookieStore implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn require_image_engine(&self) -> Result<Arc<dyn ImageEngine>> {
        self.image_engine.clone().ok_or_else(|| missing(
            "ImageEngine",
            "Image decoding needs an ImageEngine. \
             Desktop: enable the 'desktop-shims' feature. \
             Mobile: inject the platform bitmap bridge.",
        ))
    }

    pub fn require_net_engine(&self) -> Result<Arc<dyn NetEngine>> {
        self.net_engine.clone().ok_or_else(|| missing(
            "NetEngine",
            "Native requests need a NetEngine. \
             Desktop: enable the 'desktop-shims' feature. \
             Mobile: inject the platform network stack.",
        ))
    }

    pub fn require_web_engine(&self) -> Result<Arc<dyn WebEngine>> {
        self.web_engine.clone().ok_or_else(|| missing(
            "WebEngine",
            "Browser views need a host supplied WebEngine; no default exists.",
        ))
    }
}

fn missing(capability: &'static str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability,
        message: message.to_string(),
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    image_engine: Option<Arc<dyn ImageEngine>>,
    net_engine: Option<Arc<dyn NetEngine>>,
    web_engine: Option<Arc<dyn WebEngine>>,
    cookie_store: Option<Arc<dyn CookieStore>>,
    host_channel: Option<Arc<dyn HostChannel>>,
    features: FeatureFlags,
    event_buffer_size: Option<usize>,
}

impl BridgeConfigBuilder {
    pub fn image_engine(mut self, engine: Arc<dyn ImageEngine>) -> Self {
        self.image_engine = Some(engine);
        self
    }

    pub fn net_engine(mut self, engine: Arc<dyn NetEngine>) -> Self {
        self.net_engine = Some(engine);
        self
    }

    pub fn web_engine(mut self, engine: Arc<dyn WebEngine>) -> Self {
        self.web_engine = Some(engine);
        self
    }

    pub fn cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    pub fn host_channel(mut self, channel: Arc<dyn HostChannel>) -> Self {
        self.host_channel = Some(channel);
        self
    }

    pub fn enable_native_cookie(mut self, enable: bool) -> Self {
        self.features.enable_native_cookie = enable;
        self
    }

    pub fn log_payloads(mut self, enable: bool) -> Self {
        self.features.log_payloads = enable;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// With the `desktop-shims` feature, collaborators that were not injected
    /// are filled with the `bridge-desktop` implementations. The default
    /// network engine doubles as the cookie store so both share one jar.
    pub fn build(self) -> Result<BridgeConfig> {
        let mut config = BridgeConfig {
            image_engine: self.image_engine,
            net_engine: self.net_engine,
            web_engine: self.web_engine,
            cookie_store: self.cookie_store,
            host_channel: self.host_channel,
            features: self.features,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        #[cfg(feature = "desktop-shims")]
        apply_desktop_defaults(&mut config)?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "desktop-shims")]
fn apply_desktop_defaults(config: &mut BridgeConfig) -> Result<()> {
    use bridge_desktop::{RasterImageEngine, ReqwestNetEngine, TracingChannel};

    if config.image_engine.is_none() {
        let engine: Arc<dyn ImageEngine> = Arc::new(RasterImageEngine::new());
        config.image_engine = Some(engine);
    }

    if config.host_channel.is_none() {
        let channel: Arc<dyn HostChannel> = Arc::new(TracingChannel);
        config.host_channel = Some(channel);
    }

    if config.net_engine.is_none() || config.cookie_store.is_none() {
        let engine = Arc::new(ReqwestNetEngine::new().map_err(|e| {
            Error::Config(format!("Failed to create default network engine: {}", e))
        })?);

        if config.net_engine.is_none() {
            let net: Arc<dyn NetEngine> = engine.clone();
            config.net_engine = Some(net);
        }
        if config.cookie_store.is_none() {
            let store: Arc<dyn CookieStore> = engine;
            config.cookie_store = Some(store);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::NativeAddress;

    struct NullWebEngine;

    impl WebEngine for NullWebEngine {
        fn create_instance(&self) -> BridgeResult<NativeAddress> {
            Ok(1)
        }

        fn invoke(&self, _instance: NativeAddress, _method: &str, _payload: &str) -> BridgeResult<()> {
            Ok(())
        }

        fn release_instance(&self, _instance: NativeAddress) {}
    }

    struct NullCookieStore;

    impl CookieStore for NullCookieStore {
        fn get_cookie(&self, _url: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        fn set_cookie(&self, _url: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_buffer_size() {
        let config = BridgeConfig::builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let result = BridgeConfig::builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_buffer_rejected() {
        let result = BridgeConfig::builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_native_cookie_with_store() {
        let config = BridgeConfig::builder()
            .cookie_store(Arc::new(NullCookieStore))
            .enable_native_cookie(true)
            .log_payloads(true)
            .build()
            .unwrap();

        assert!(config.features.enable_native_cookie);
        assert!(config.features.log_payloads);
        assert!(config.cookie_store.is_some());
    }

    #[test]
    fn test_web_engine_has_no_default() {
        let config = BridgeConfig::builder().build().unwrap();
        match config.require_web_engine() {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "WebEngine");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_injected_web_engine_is_returned() {
        let config = BridgeConfig::builder()
            .web_engine(Arc::new(NullWebEngine))
            .build()
            .unwrap();
        assert!(config.require_web_engine().is_ok());
    }

    #[test]
    fn test_debug_hides_collaborators() {
        let config = BridgeConfig::builder()
            .web_engine(Arc::new(NullWebEngine))
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("WebEngine { ... }"));
        assert!(debug.contains("event_buffer_size: 100"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_injected() {
        let config = BridgeConfig::builder().build().unwrap();
        assert!(config.require_image_engine().is_ok());
        assert!(config.require_net_engine().is_ok());
        assert!(config.cookie_store.is_some());
        assert!(config.host_channel.is_some());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_engines_without_shims() {
        let config = BridgeConfig::builder().build().unwrap();
        assert!(matches!(
            config.require_image_engine(),
            Err(Error::CapabilityMissing { capability: "ImageEngine", .. })
        ));
        assert!(matches!(
            config.require_net_engine(),
            Err(Error::CapabilityMissing { capability: "NetEngine", .. })
        ));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_native_cookie_without_store_rejected() {
        let result = BridgeConfig::builder().enable_native_cookie(true).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
