//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the bridge crates:
//! - Logging and tracing setup
//! - Configuration (`BridgeConfig`) with injected native engines
//! - Event bus for lifecycle, browser and network notifications
//!
//! ## Overview
//!
//! Nothing in here talks to the native side directly. `core-bridge` builds its
//! context from a [`BridgeConfig`](config::BridgeConfig) and publishes to the
//! [`EventBus`](events::EventBus) defined here.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
