//! Lease timer port: schedule and cancel lease expiries.

use std::time::Duration;

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::id::LeaseId;

/// Schedules one expiry per lease.
///
/// When a scheduled timer fires, the implementation must deliver
/// `(key, lease)` back to the scheduler's event queue, where it is processed
/// like any other event. It must never call into the scheduler directly.
pub trait LeaseTimer {
    /// Arrange for `lease` on `key` to expire after `after`.
    fn schedule(&self, key: &DeviceKey, lease: LeaseId, after: Duration);

    /// Cancel the expiry of `lease`. Cancelling an unknown or already fired
    /// lease is a no-op.
    fn cancel(&self, lease: LeaseId);
}

impl<T: LeaseTimer + ?Sized> LeaseTimer for std::sync::Arc<T> {
    fn schedule(&self, key: &DeviceKey, lease: LeaseId, after: Duration) {
        (**self).schedule(key, lease, after);
    }

    fn cancel(&self, lease: LeaseId) {
        (**self).cancel(lease);
    }
}
