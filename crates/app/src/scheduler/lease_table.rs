//! Lease table: active leases keyed by device.

use std::collections::HashMap;

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::lease::Lease;

/// Mapping from device key to its active [`Lease`].
///
/// The table does not enforce the concurrency ceiling itself; the scheduler
/// only inserts when it has checked there is room.
#[derive(Debug, Default)]
pub struct LeaseTable {
    leases: HashMap<DeviceKey, Lease>,
}

impl LeaseTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `lease`, returning any lease the key held before.
    pub fn insert(&mut self, lease: Lease) -> Option<Lease> {
        self.leases.insert(lease.key.clone(), lease)
    }

    pub fn remove(&mut self, key: &DeviceKey) -> Option<Lease> {
        self.leases.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &DeviceKey) -> Option<&Lease> {
        self.leases.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &DeviceKey) -> bool {
        self.leases.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lease> {
        self.leases.values()
    }

    /// Active leases, oldest grant first.
    #[must_use]
    pub fn by_grant_time(&self) -> Vec<&Lease> {
        let mut leases: Vec<&Lease> = self.leases.values().collect();
        leases.sort_by(|a, b| a.granted_at.cmp(&b.granted_at).then_with(|| a.key.cmp(&b.key)));
        leases
    }

    /// Remove and return every lease, oldest grant first.
    pub fn drain(&mut self) -> Vec<Lease> {
        let mut leases: Vec<Lease> = self.leases.drain().map(|(_, lease)| lease).collect();
        leases.sort_by(|a, b| a.granted_at.cmp(&b.granted_at).then_with(|| a.key.cmp(&b.key)));
        leases
    }
}
