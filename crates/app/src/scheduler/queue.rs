//! Request queue: FIFO of pending device keys, free of duplicates.

use std::collections::{HashSet, VecDeque};

use roomlease_domain::device_key::DeviceKey;

/// Ordered, duplicate-free sequence of keys waiting for a grant.
///
/// Membership is tracked in a hash set alongside the order so that
/// `contains` is O(1).
#[derive(Debug, Default)]
pub struct RequestQueue {
    order: VecDeque<DeviceKey>,
    members: HashSet<DeviceKey>,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key` at the tail. Returns `false` (and changes nothing) when
    /// the key is already queued.
    pub fn enqueue(&mut self, key: DeviceKey) -> bool {
        if !self.members.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        true
    }

    /// Pop the head of the queue.
    pub fn dequeue(&mut self) -> Option<DeviceKey> {
        let key = self.order.pop_front()?;
        self.members.remove(&key);
        Some(key)
    }

    /// Remove `key` wherever it sits. Returns whether it was queued.
    pub fn remove(&mut self, key: &DeviceKey) -> bool {
        if !self.members.remove(key) {
            return false;
        }
        self.order.retain(|queued| queued != key);
        true
    }

    #[must_use]
    pub fn contains(&self, key: &DeviceKey) -> bool {
        self.members.contains(key)
    }

    /// Zero-based distance from the head.
    #[must_use]
    pub fn position(&self, key: &DeviceKey) -> Option<usize> {
        if !self.contains(key) {
            return None;
        }
        self.order.iter().position(|queued| queued == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceKey> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
