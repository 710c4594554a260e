//! Observable results of scheduler events: per-call outcomes, running
//! counters and point-in-time snapshots.

use serde::Serialize;

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::lease::Lease;

/// What an `on_request` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Queued and granted straight away.
    Granted,
    /// Queued behind other waiters; `position` is zero-based.
    Queued { position: usize },
    /// Already holding a lease; nothing changed.
    DuplicateActive,
    /// Already waiting; nothing changed.
    DuplicateQueued,
    /// Off-request for an active key: the lease was revoked.
    Released,
    /// Off-request for a queued key: it left the queue.
    Withdrawn,
    /// Off-request for a key with no lease and no pending request.
    AlreadyIdle,
    /// The queue is full; the request was dropped.
    Rejected,
}

/// What an `on_ack` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// ACK-on for a key holding a lease.
    Confirmed,
    /// ACK-on for a key without a lease.
    Unsolicited,
    /// ACK-off for a key holding a lease: the lease was revoked.
    Released,
    /// ACK-off for a key without a lease.
    NotHeld,
}

/// What an `on_lease_expired` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// The lease was revoked and its key sent to the back of the queue.
    Rotated,
    /// Nobody was waiting: the key got a fresh lease without being revoked.
    Renewed,
    /// The expiry belongs to a lease that no longer exists.
    Stale,
}

impl RequestOutcome {
    /// Short name used as a metric label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Queued { .. } => "queued",
            Self::DuplicateActive => "duplicate_active",
            Self::DuplicateQueued => "duplicate_queued",
            Self::Released => "released",
            Self::Withdrawn => "withdrawn",
            Self::AlreadyIdle => "already_idle",
            Self::Rejected => "rejected",
        }
    }
}

impl AckOutcome {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Unsolicited => "unsolicited",
            Self::Released => "released",
            Self::NotHeld => "not_held",
        }
    }
}

impl ExpiryOutcome {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Rotated => "rotated",
            Self::Renewed => "renewed",
            Self::Stale => "stale",
        }
    }
}

/// Running counters, one per observation the scheduler makes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub requests: u64,
    pub acks: u64,
    pub grants: u64,
    pub revocations: u64,
    pub expirations: u64,
    pub renewals: u64,
    pub duplicate_active: u64,
    pub duplicate_queued: u64,
    pub withdrawn: u64,
    pub rejected: u64,
    pub unsolicited_acks: u64,
    pub dropped_malformed: u64,
    pub publish_failures: u64,
    pub stale_expiries: u64,
}

/// Serializable view of the scheduler at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    /// Active leases, oldest grant first.
    pub active: Vec<Lease>,
    /// Pending keys, head first.
    pub queued: Vec<DeviceKey>,
    pub stats: SchedulerStats,
}

impl SchedulerSnapshot {
    /// Whether no key is both active and queued, and no key repeats.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.active
            .iter()
            .map(|lease| &lease.key)
            .chain(self.queued.iter())
            .all(|key| seen.insert(key))
    }
}
