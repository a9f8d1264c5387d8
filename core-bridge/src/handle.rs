//! Native handle with exactly-once release.

use bridge_traits::NativeAddress;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque address of a resource owned by the native collaborator.
///
/// `0` means empty: never set, or already released. Once cleared the handle
/// stays at `0`, so the native release for any non-zero address runs at most
/// once no matter how many owners race on [`clear`](Self::clear).
pub struct NativeHandle {
    address: AtomicU64,
}

impl NativeHandle {
    pub const fn new(address: NativeAddress) -> Self {
        Self {
            address: AtomicU64::new(address),
        }
    }

    pub const fn empty() -> Self {
        Self::new(0)
    }

    pub fn address(&self) -> NativeAddress {
        self.address.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.address() == 0
    }

    /// Swap the address to `0`, returning what was stored.
    pub fn clear(&self) -> NativeAddress {
        self.address.swap(0, Ordering::AcqRel)
    }

    /// Clear the handle and hand the previous address to `release` if it
    /// was non-zero. Returns whether `release` ran.
    pub fn release_with<F>(&self, release: F) -> bool
    where
        F: FnOnce(NativeAddress),
    {
        match self.clear() {
            0 => false,
            previous => {
                release(previous);
                true
            }
        }
    }
}

impl Default for NativeHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.address())
    }
}
