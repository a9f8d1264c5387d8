//! # Object Registry
//!
//! Maps native object ids to the managed objects that own them, so inbound
//! events from native threads can find their target.
//!
//! Entries hold [`Weak`] references: the registry never keeps an object alive,
//! and an entry whose owner is gone behaves exactly like a missing entry.
//! A miss is the normal outcome of the race between native delivery and
//! teardown, not an error.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

pub struct ObjectRegistry<T: ?Sized> {
    entries: RwLock<HashMap<u64, Weak<T>>>,
}

impl<T: ?Sized> ObjectRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register `owner` under `id`, replacing any previous entry.
    ///
    /// Returns the previous owner if it was still alive.
    pub fn insert(&self, id: u64, owner: &Arc<T>) -> Option<Arc<T>> {
        let previous = self
            .entries
            .write()
            .insert(id, Arc::downgrade(owner))
            .and_then(|weak| weak.upgrade());

        if previous.is_some() {
            warn!(object_id = id, "Replaced a live registry entry");
        }
        previous
    }

    pub fn lookup(&self, id: u64) -> Option<Arc<T>> {
        self.entries.read().get(&id).and_then(Weak::upgrade)
    }

    /// Returns whether an entry existed.
    pub fn remove(&self, id: u64) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    /// Remove the entry under `id` only if it still points at `owner`.
    ///
    /// Native addresses are reused, so by the time an owner unregisters, a
    /// newer object may already hold the id. That entry is left alone.
    pub fn remove_owned(&self, id: u64, owner: &Arc<T>) -> bool {
        let mut entries = self.entries.write();
        let owned = entries
            .get(&id)
            .is_some_and(|weak| weak.as_ptr().cast::<()>() == Arc::as_ptr(owner).cast::<()>());

        if owned {
            entries.remove(&id);
        } else {
            debug!(object_id = id, "Registry entry belongs to another owner");
        }
        owned
    }

    pub fn contains(&self, id: u64) -> bool {
        self.lookup(id).is_some()
    }

    /// Number of entries whose owner is still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Drop entries whose owner has gone away. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }
}

impl<T: ?Sized> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for ObjectRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}
