//! # Bridge Error Types
//!
//! Failures surfaced by the managed side of the native boundary. Runtime
//! failures of the native collaborator mostly become data (sentinel responses,
//! logged no-ops); what remains here is what a caller can act on.

use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before crossing the boundary.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The object's native counterpart was already released.
    #[error("Stale reference: {0}")]
    StaleReference(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing {
        capability: &'static str,
        message: String,
    },

    /// The native network stack reported an error for a request.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Native call failed: {0}")]
    Bridge(#[from] BridgeError),
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Why an inbound script call could not be routed to a bound interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No interface bound as '{0}'")]
    UnknownInterface(String),

    #[error("Interface '{interface}' has no method '{method}'")]
    UnknownMethod { interface: String, method: String },

    #[error("Call to '{interface}.{method}' failed: {reason}")]
    InvocationFailed {
        interface: String,
        method: String,
        reason: String,
    },
}
