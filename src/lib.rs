//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service` and, through it, `core-bridge` and
//! `bridge-desktop`). Host applications can depend on `native-bridge-workspace`
//! and enable `desktop-shims` or `ffi` without wiring each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "ffi"))]
pub use core_service::*;
