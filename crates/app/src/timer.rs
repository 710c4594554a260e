//! Lease timers backed by tokio tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::id::LeaseId;

use crate::ports::LeaseTimer;
use crate::runtime::{SchedulerHandle, WeakSchedulerHandle};

/// One sleeping task per live lease. When a task wakes it feeds
/// [`SchedulerHandle::expire`], so the expiry is serialized with every other
/// scheduler event.
///
/// The timer only holds a weak handle: pending leases never keep the
/// scheduler loop alive once every other handle is dropped.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct TokioLeaseTimer {
    handle: WeakSchedulerHandle,
    pending: Arc<Mutex<HashMap<LeaseId, AbortHandle>>>,
}

impl TokioLeaseTimer {
    #[must_use]
    pub fn new(handle: SchedulerHandle) -> Self {
        Self {
            handle: handle.downgrade(),
            pending: Arc::default(),
        }
    }

    /// Number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl LeaseTimer for TokioLeaseTimer {
    fn schedule(&self, key: &DeviceKey, lease: LeaseId, after: Duration) {
        // Held across the spawn so the task cannot remove its entry before
        // it is inserted.
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let key = key.clone();
        let handle = self.handle.clone();
        let registry = Arc::clone(&self.pending);
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&lease);
            tracing::debug!(key = %key, lease_id = %lease, "lease timer fired");
            let delivered = handle
                .upgrade()
                .is_some_and(|handle| handle.expire(key, lease));
            if !delivered {
                tracing::debug!(lease_id = %lease, "scheduler stopped before lease expiry");
            }
        });

        pending.insert(lease, task.abort_handle());
    }

    fn cancel(&self, lease: LeaseId) {
        let task = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&lease);
        if let Some(task) = task {
            task.abort();
        }
    }
}
