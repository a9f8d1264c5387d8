//! Bridge service façade and bootstrap helpers.
//!
//! This crate wires host-provided collaborators (image engine, network
//! stack, browser engine, cookie jar, host channel) into one
//! [`BridgeContext`]. Desktop hosts typically enable the `desktop-shims`
//! feature, which fills every collaborator the host did not inject with the
//! `bridge-desktop` implementations. Native hosts that deliver events through
//! a C ABI enable the `ffi` feature and [`ffi::install`] the service once.

pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;

pub use error::{Result, ServiceError};

pub use bridge_traits;
pub use core_bridge;
pub use core_runtime;

use core_bridge::{BridgeContext, Delivery, WebView};
use core_runtime::config::BridgeConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone, Debug)]
pub struct BridgeService {
    context: Arc<BridgeContext>,
}

impl BridgeService {
    /// Create a service from a validated configuration.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        Ok(Self {
            context: Arc::new(BridgeContext::new(config)?),
        })
    }

    /// Install logging (when `logging` is given), then build the context.
    ///
    /// Logging can only be installed once per process; a second attempt
    /// fails with [`core_runtime::Error::Logging`].
    pub fn bootstrap(config: BridgeConfig, logging: Option<LoggingConfig>) -> Result<Self> {
        if let Some(logging) = logging {
            init_logging(logging)?;
        }

        let service = Self::new(config)?;
        info!(
            native_cookie = service.context.cookies().is_enabled(),
            "Bridge service ready"
        );
        Ok(service)
    }

    pub fn context(&self) -> &BridgeContext {
        &self.context
    }

    pub fn create_web_view(&self) -> Result<WebView> {
        Ok(self.context.create_web_view()?)
    }

    /// Inbound entry point for native events.
    pub fn deliver_event(&self, object_id: u64, method: &str, payload: &str) -> Delivery {
        self.context.deliver_event(object_id, method, payload)
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// ```no_run
/// # fn example() -> core_service::Result<()> {
/// use core_service::bootstrap_desktop;
/// use core_service::core_runtime::logging::LoggingConfig;
///
/// let service = bootstrap_desktop(Some(LoggingConfig::default()))?;
/// let thumb = service.context().create_bitmap(200, 300)?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(logging: Option<LoggingConfig>) -> Result<BridgeService> {
    let config = BridgeConfig::builder().build()?;
    BridgeService::bootstrap(config, logging)
}
