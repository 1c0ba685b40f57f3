//! Recovery subscriber registry
//!
//! UI consumers (map layers, 3D scenes, upload queues) register a callback
//! to drop their reclaimable state when a recovery pass runs. The registry
//! is keyed by handle identity: each subscription runs at most once per
//! session, and unsubscribing is an idempotent O(1) removal — dropping a
//! handle twice, or after the registry already forgot it, is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::Result;

/// A recovery callback: a fast, synchronous side effect that releases
/// reclaimable state. Failures are reported, logged by the controller, and
/// isolated from other subscribers.
pub type RecoveryCallback = dyn Fn() -> Result<()> + Send + Sync;

/// Handle identifying one registration.
///
/// Opaque; pass it back to [`SubscriberRegistry::unsubscribe`] to dispose
/// of the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverySubscription {
    id: u64,
}

/// De-duplicated set of recovery callbacks keyed by registration identity.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Arc<RecoveryCallback>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; returns the disposer handle.
    pub fn subscribe<F>(&self, callback: F) -> RecoverySubscription
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("registry lock poisoned")
            .insert(id, Arc::new(callback));
        debug!(subscriber = id, "recovery subscriber registered");
        RecoverySubscription { id }
    }

    /// Remove a registration. Returns whether it was still present; calling
    /// again with the same handle is a no-op.
    pub fn unsubscribe(&self, subscription: &RecoverySubscription) -> bool {
        let removed = self
            .subscribers
            .lock()
            .expect("registry lock poisoned")
            .remove(&subscription.id)
            .is_some();
        if removed {
            debug!(subscriber = subscription.id, "recovery subscriber removed");
        }
        removed
    }

    /// Stable snapshot of the current registrations, for invocation outside
    /// the registry lock.
    pub fn snapshot(&self) -> Vec<(u64, Arc<RecoveryCallback>)> {
        let mut entries: Vec<_> = self
            .subscribers
            .lock()
            .expect("registry lock poisoned")
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .expect("registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
