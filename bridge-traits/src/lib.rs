//! # Native Bridge Traits
//!
//! Contract between the managed-side core and the native collaborator that
//! owns images, the embedded browser and the network stack.
//!
//! ## Overview
//!
//! Each trait is one narrow, synchronous call surface into the native side.
//! The core never looks behind these traits; it only holds the opaque
//! [`NativeAddress`](image::NativeAddress) values they hand out and gives each
//! one back exactly once.
//!
//! ## Traits
//!
//! ### Resources
//! - [`ImageEngine`](image::ImageEngine) - decode, allocate surfaces, draw, encode, release
//! - [`WebEngine`](web::WebEngine) - create/invoke/release browser instances
//!
//! ### Networking
//! - [`NetEngine`](net::NetEngine) - blocking request/response with segmented replies
//! - [`CookieStore`](net::CookieStore) - native cookie jar access
//!
//! ### Host integration
//! - [`HostChannel`](channel::HostChannel) - fire-and-forget topic messages
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//! - [`Clock`](time::Clock) - time source for latency measurement
//!
//! ## Implementations
//!
//! | Capability | Desktop (`bridge-desktop`) |
//! |------------|----------------------------|
//! | `ImageEngine` | `RasterImageEngine` (image crate) |
//! | `NetEngine` + `CookieStore` | `ReqwestNetEngine` |
//! | `HostChannel` | `TracingChannel` |
//! | `WebEngine` | host supplied |
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`: the core calls them from application
//! threads while the native side delivers events from its own threads.
//!
//! ## Error Handling
//!
//! Fallible calls return [`BridgeError`](error::BridgeError). Release calls
//! are infallible; releasing an unknown address must be a silent no-op.

pub mod channel;
pub mod error;
pub mod image;
pub mod net;
pub mod time;
pub mod web;

pub use error::BridgeError;

pub use channel::HostChannel;
pub use image::{CompressFormat, DecodedImage, ImageEngine, NativeAddress, Rect};
pub use net::{CookieStore, NetEngine, NetMethod, NetRequest, NetResponseMeta};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use web::WebEngine;
