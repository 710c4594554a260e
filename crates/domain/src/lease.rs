//! Leases and the per-device admission state.

use std::time::Duration;

use serde::Serialize;

use crate::device_key::DeviceKey;
use crate::id::LeaseId;
use crate::time::{Timestamp, add_duration};

/// A time-bounded grant of activation to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lease {
    pub id: LeaseId,
    pub key: DeviceKey,
    pub granted_at: Timestamp,
    #[serde(rename = "lease_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl Lease {
    /// Mint a fresh lease for `key`.
    #[must_use]
    pub fn new(key: DeviceKey, granted_at: Timestamp, duration: Duration) -> Self {
        Self {
            id: LeaseId::new(),
            key,
            granted_at,
            duration,
        }
    }

    /// When the lease runs out if nothing revokes it first.
    #[must_use]
    pub fn expires_at(&self) -> Timestamp {
        add_duration(self.granted_at, self.duration)
    }
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// Where a device currently stands with the scheduler.
///
/// A device is in exactly one of these states; a key can never be queued and
/// active at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeviceState {
    /// No lease and no pending request.
    Idle,
    /// Waiting for capacity; `position` is zero-based from the head.
    Queued { position: usize },
    /// Holding a lease.
    Active {
        lease_id: LeaseId,
        granted_at: Timestamp,
        expires_at: Timestamp,
    },
}

impl DeviceState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

impl From<&Lease> for DeviceState {
    fn from(lease: &Lease) -> Self {
        Self::Active {
            lease_id: lease.id,
            granted_at: lease.granted_at,
            expires_at: lease.expires_at(),
        }
    }
}
