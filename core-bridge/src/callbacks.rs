//! # Callback Table
//!
//! Correlates asynchronous results with the continuation waiting for them.
//! Ids come from a monotonically increasing counter starting at 1 and are
//! never reused while the table lives. Each continuation is handed out at
//! most once; a result for an unknown or already-resolved id is dropped.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request id shared with the native side.
///
/// Serialized as a JSON number. Parsed from either a number or a decimal
/// string, since native engines echo it back in both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(u64);

impl CallbackId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Read an id from an inbound JSON value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CallbackId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

pub struct CallbackTable<C> {
    next_id: AtomicU64,
    pending: Mutex<HashMap<CallbackId, C>>,
}

impl<C> CallbackTable<C> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh id without parking anything.
    pub fn issue(&self) -> CallbackId {
        CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Park `continuation` under `id`.
    pub fn park(&self, id: CallbackId, continuation: C) {
        self.pending.lock().insert(id, continuation);
    }

    /// Allocate an id and park `continuation` under it.
    pub fn register(&self, continuation: C) -> CallbackId {
        let id = self.issue();
        self.park(id, continuation);
        id
    }

    /// Remove and return the continuation parked under `id`.
    pub fn resolve(&self, id: CallbackId) -> Option<C> {
        self.pending.lock().remove(&id)
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<C> Default for CallbackTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for CallbackTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("issued", &self.next_id.load(Ordering::Relaxed))
            .field("pending", &self.pending())
            .finish()
    }
}
