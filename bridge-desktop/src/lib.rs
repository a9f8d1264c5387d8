//! # Desktop Bridge Implementations
//!
//! In-process implementations of the native collaborator traits for desktop
//! platforms (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ImageEngine` using the `image` crate ([`RasterImageEngine`])
//! - `NetEngine` + `CookieStore` using blocking `reqwest` ([`ReqwestNetEngine`])
//! - `HostChannel` writing to the tracing log ([`TracingChannel`])
//!
//! No `WebEngine` is provided; embedding a browser is left to the host.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{RasterImageEngine, ReqwestNetEngine};
//! use std::sync::Arc;
//!
//! let images = Arc::new(RasterImageEngine::new());
//! let net = Arc::new(ReqwestNetEngine::new()?);
//! // Inject into BridgeConfig
//! ```

mod channel;
mod net;
mod raster;

pub use channel::TracingChannel;
pub use net::ReqwestNetEngine;
pub use raster::RasterImageEngine;
