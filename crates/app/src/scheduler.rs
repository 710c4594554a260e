//! Admission controller: decides which actuators may be active, for how
//! long, and in which order waiting requests are served.
//!
//! The controller owns the [`RequestQueue`] and the [`LeaseTable`] outright.
//! Every entry point takes `&mut self`, so the caller serializes events (see
//! [`crate::runtime`]) and no locking is needed inside.
//!
//! New keys are admitted in exactly one place, [`AdmissionController::schedule`],
//! which drains the queue head-first while there is free capacity. A lease
//! ends in one of three ways: an off-request, an ACK-off, or its timer
//! firing. Only the last one sends the key back to the tail of the queue,
//! and only when someone else is waiting; otherwise the lease is renewed.

pub mod config;
pub mod lease_table;
pub mod queue;
pub mod routing;
pub mod stats;

pub use config::SchedulerConfig;
pub use lease_table::LeaseTable;
pub use queue::RequestQueue;
pub use routing::{Inbound, route};
pub use stats::{AckOutcome, ExpiryOutcome, RequestOutcome, SchedulerSnapshot, SchedulerStats};

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::error::RoomLeaseError;
use roomlease_domain::id::LeaseId;
use roomlease_domain::lease::{DeviceState, Lease};
use roomlease_domain::message::BusMessage;
use roomlease_domain::payload::GrantPayload;
use roomlease_domain::topic::grant_topic;

use crate::metrics;
use crate::ports::{Clock, LeaseTimer, MessagePublisher, SystemClock};

/// Result of dispatching one routed bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Request(RequestOutcome),
    Ack(AckOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    OffRequest,
    AckOff,
    Expired,
    Shutdown,
}

impl EndReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::OffRequest => "off_request",
            Self::AckOff => "ack_off",
            Self::Expired => "expired",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Single authority over actuator activation across all rooms.
pub struct AdmissionController<P, T, C = SystemClock> {
    config: SchedulerConfig,
    publisher: P,
    timer: T,
    clock: C,
    queue: RequestQueue,
    leases: LeaseTable,
    stats: SchedulerStats,
}

impl<P, T, C> AdmissionController<P, T, C>
where
    P: MessagePublisher,
    T: LeaseTimer,
    C: Clock,
{
    /// Create a controller with an empty queue and no leases.
    ///
    /// # Errors
    ///
    /// Returns [`RoomLeaseError::Validation`] when `config` is unusable.
    pub fn new(
        config: SchedulerConfig,
        publisher: P,
        timer: T,
        clock: C,
    ) -> Result<Self, RoomLeaseError> {
        config.validate()?;
        Ok(Self {
            config,
            publisher,
            timer,
            clock,
            queue: RequestQueue::new(),
            leases: LeaseTable::new(),
            stats: SchedulerStats::default(),
        })
    }

    /// Route a raw bus message and apply it.
    ///
    /// Malformed topics and payloads are logged, counted and dropped without
    /// touching any state. Echoes of our own grants are ignored.
    pub fn dispatch(&mut self, message: &BusMessage) -> Option<Dispatched> {
        match route(message) {
            Ok(Inbound::Request { key, desired_on }) => {
                Some(Dispatched::Request(self.on_request(key, desired_on)))
            }
            Ok(Inbound::Ack { key, reported_on }) => {
                Some(Dispatched::Ack(self.on_ack(&key, reported_on)))
            }
            Ok(Inbound::Grant { key }) => {
                tracing::trace!(key = %key, "ignoring grant echo");
                None
            }
            Err(err) => {
                self.stats.dropped_malformed += 1;
                metrics::record_dropped_message();
                tracing::warn!(topic = %message.topic, error = ?err, "dropping malformed message");
                None
            }
        }
    }

    /// A room asks for `key` to be switched on or off.
    pub fn on_request(&mut self, key: DeviceKey, desired_on: bool) -> RequestOutcome {
        self.stats.requests += 1;
        let outcome = if desired_on {
            self.request_on(key)
        } else {
            self.request_off(&key)
        };
        metrics::record_request(outcome);
        self.settle();
        outcome
    }

    /// An actuator reports the state it actually executed.
    pub fn on_ack(&mut self, key: &DeviceKey, reported_on: bool) -> AckOutcome {
        self.stats.acks += 1;
        let outcome = if reported_on {
            if self.leases.contains(key) {
                tracing::debug!(key = %key, "grant confirmed by actuator");
                AckOutcome::Confirmed
            } else {
                self.stats.unsolicited_acks += 1;
                tracing::debug!(key = %key, "actuator reports on without a lease");
                AckOutcome::Unsolicited
            }
        } else if self.end_lease(key, EndReason::AckOff).is_some() {
            self.schedule();
            AckOutcome::Released
        } else {
            tracing::debug!(key = %key, "ack off for a device without a lease");
            AckOutcome::NotHeld
        };
        metrics::record_ack(outcome);
        self.settle();
        outcome
    }

    /// The timer of `lease` on `key` fired.
    ///
    /// With other keys waiting, the lease is revoked and the key goes to the
    /// tail of the queue, behind every request that arrived before this
    /// expiry. With nobody waiting the key would be granted again at once, so
    /// the lease is renewed in place instead: a fresh lease and a fresh grant,
    /// but no revocation in between. An expiry for a lease that has since
    /// been replaced or revoked is ignored.
    pub fn on_lease_expired(&mut self, key: &DeviceKey, lease: LeaseId) -> ExpiryOutcome {
        if self.leases.get(key).is_none_or(|current| current.id != lease) {
            self.stats.stale_expiries += 1;
            tracing::debug!(key = %key, lease_id = %lease, "ignoring stale lease expiry");
            metrics::record_expiry(ExpiryOutcome::Stale);
            return ExpiryOutcome::Stale;
        }

        self.stats.expirations += 1;
        let outcome = if self.queue.is_empty() {
            self.renew(key);
            ExpiryOutcome::Renewed
        } else {
            self.end_lease(key, EndReason::Expired);
            // Rotation may exceed `max_queue_len`: the key already held
            // capacity and its demand stands until it asks for off.
            self.queue.enqueue(key.clone());
            self.schedule();
            ExpiryOutcome::Rotated
        };
        metrics::record_expiry(outcome);
        self.settle();
        outcome
    }

    /// Revoke every active lease and forget every pending request.
    pub fn shutdown(&mut self) {
        let pending = self.queue.len();
        self.queue.clear();
        let leases = self.leases.drain();
        let revoked = leases.len();
        for lease in leases {
            self.timer.cancel(lease.id);
            self.publish_grant(&lease.key, GrantPayload::revoked());
            self.stats.revocations += 1;
            metrics::record_revocation(&lease.key, EndReason::Shutdown.as_str());
            tracing::debug!(key = %lease.key, lease_id = %lease.id, reason = EndReason::Shutdown.as_str(), "lease revoked");
        }
        self.settle();
        tracing::info!(revoked, pending, "scheduler shut down");
    }

    /// Where `key` stands right now.
    #[must_use]
    pub fn state_of(&self, key: &DeviceKey) -> DeviceState {
        if let Some(lease) = self.leases.get(key) {
            return DeviceState::from(lease);
        }
        match self.queue.position(key) {
            Some(position) => DeviceState::Queued { position },
            None => DeviceState::Idle,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            active: self.leases.by_grant_time().into_iter().cloned().collect(),
            queued: self.queue.iter().cloned().collect(),
            stats: self.stats,
        }
    }

    #[must_use]
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.leases.len()
    }

    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    fn request_on(&mut self, key: DeviceKey) -> RequestOutcome {
        if self.leases.contains(&key) {
            self.stats.duplicate_active += 1;
            tracing::debug!(key = %key, "duplicate request for an active device");
            return RequestOutcome::DuplicateActive;
        }
        if self.queue.contains(&key) {
            self.stats.duplicate_queued += 1;
            tracing::debug!(key = %key, "duplicate request for a queued device");
            return RequestOutcome::DuplicateQueued;
        }
        if self.queue.len() >= self.config.max_queue_len {
            self.stats.rejected += 1;
            tracing::warn!(
                key = %key,
                max_queue_len = self.config.max_queue_len,
                "request queue full, rejecting request"
            );
            return RequestOutcome::Rejected;
        }

        self.queue.enqueue(key.clone());
        tracing::debug!(key = %key, queued = self.queue.len(), "request queued");
        self.schedule();

        match self.queue.position(&key) {
            Some(position) => RequestOutcome::Queued { position },
            None => RequestOutcome::Granted,
        }
    }

    fn request_off(&mut self, key: &DeviceKey) -> RequestOutcome {
        if self.end_lease(key, EndReason::OffRequest).is_some() {
            self.schedule();
            return RequestOutcome::Released;
        }
        if self.queue.remove(key) {
            self.stats.withdrawn += 1;
            tracing::debug!(key = %key, "pending request withdrawn");
            return RequestOutcome::Withdrawn;
        }
        tracing::debug!(key = %key, "off request for an idle device");
        RequestOutcome::AlreadyIdle
    }

    /// Grant the queue head while there is capacity. The only place a key
    /// without a lease gets one.
    fn schedule(&mut self) {
        while self.leases.len() < self.config.max_concurrent_leases {
            let Some(key) = self.queue.dequeue() else {
                break;
            };
            self.grant(key);
        }
    }

    fn grant(&mut self, key: DeviceKey) {
        debug_assert!(
            self.leases.len() < self.config.max_concurrent_leases,
            "grant without free capacity"
        );
        debug_assert!(!self.leases.contains(&key), "grant for an active key");
        if self.leases.len() >= self.config.max_concurrent_leases || self.leases.contains(&key) {
            tracing::error!(key = %key, "refusing grant that would break the lease invariants");
            return;
        }

        let lease = Lease::new(key, self.clock.now(), self.config.lease_duration());
        self.timer.schedule(&lease.key, lease.id, lease.duration);
        self.publish_grant(&lease.key, GrantPayload::granted(lease.duration));
        self.stats.grants += 1;
        metrics::record_grant(&lease.key);
        tracing::info!(
            key = %lease.key,
            lease_id = %lease.id,
            expires_at = %lease.expires_at(),
            active = self.leases.len() + 1,
            "lease granted"
        );
        self.leases.insert(lease);
    }

    /// Replace the expired lease of `key` with a fresh one. The device stays
    /// on, so only the new grant is published.
    fn renew(&mut self, key: &DeviceKey) {
        let Some(expired) = self.leases.remove(key) else {
            return;
        };
        let lease = Lease::new(expired.key, self.clock.now(), self.config.lease_duration());
        self.timer.schedule(&lease.key, lease.id, lease.duration);
        self.publish_grant(&lease.key, GrantPayload::granted(lease.duration));
        self.stats.grants += 1;
        self.stats.renewals += 1;
        metrics::record_grant(&lease.key);
        tracing::info!(
            key = %lease.key,
            lease_id = %lease.id,
            previous_lease_id = %expired.id,
            expires_at = %lease.expires_at(),
            "lease renewed"
        );
        self.leases.insert(lease);
    }

    /// Remove the lease of `key`, cancel its timer unless it is the one that
    /// fired, and publish the revocation.
    fn end_lease(&mut self, key: &DeviceKey, reason: EndReason) -> Option<Lease> {
        let lease = self.leases.remove(key)?;
        if reason != EndReason::Expired {
            self.timer.cancel(lease.id);
        }
        self.publish_grant(key, GrantPayload::revoked());
        self.stats.revocations += 1;
        metrics::record_revocation(key, reason.as_str());
        tracing::info!(
            key = %key,
            lease_id = %lease.id,
            reason = reason.as_str(),
            active = self.leases.len(),
            "lease revoked"
        );
        Some(lease)
    }

    /// Publish without rolling back on failure: an undelivered grant is never
    /// acknowledged and its lease still expires on schedule.
    fn publish_grant(&mut self, key: &DeviceKey, payload: GrantPayload) {
        let topic = grant_topic(key);
        if let Err(err) = self.publisher.publish(&topic, payload.to_bytes()) {
            self.stats.publish_failures += 1;
            metrics::record_publish_failure();
            tracing::warn!(%topic, value = payload.value, error = ?err, "failed to publish grant");
        }
    }

    /// Refresh the occupancy gauges and check the lease invariants after
    /// every event.
    fn settle(&self) {
        metrics::record_occupancy(self.leases.len(), self.queue.len());
        self.debug_check_invariants();
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.leases.len() <= self.config.max_concurrent_leases,
            "more leases than max_concurrent_leases"
        );
        debug_assert!(
            self.leases.iter().all(|lease| !self.queue.contains(&lease.key)),
            "device both active and queued"
        );
    }
}

#[cfg(test)]
mod tests;
