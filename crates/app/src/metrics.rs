//! Prometheus-compatible scheduler metrics.
//!
//! Recorded through the [`metrics`] facade: without an installed recorder
//! every call is a no-op, so the scheduler never depends on an exporter.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `roomlease_requests_total` | Counter | `outcome` |
//! | `roomlease_acks_total` | Counter | `outcome` |
//! | `roomlease_expirations_total` | Counter | `outcome` |
//! | `roomlease_grants_total` | Counter | - |
//! | `roomlease_revocations_total` | Counter | `reason` |
//! | `roomlease_dropped_messages_total` | Counter | - |
//! | `roomlease_publish_failures_total` | Counter | - |
//! | `roomlease_active_leases` | Gauge | - |
//! | `roomlease_queued_requests` | Gauge | - |
//! | `roomlease_actuator_state` | Gauge | `room_id`, `actuator` |

use metrics::{counter, describe_counter, describe_gauge, gauge};

use roomlease_domain::device_key::DeviceKey;

use crate::scheduler::{AckOutcome, ExpiryOutcome, RequestOutcome};

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "roomlease_requests_total";
    pub const ACKS_TOTAL: &str = "roomlease_acks_total";
    pub const EXPIRATIONS_TOTAL: &str = "roomlease_expirations_total";
    pub const GRANTS_TOTAL: &str = "roomlease_grants_total";
    pub const REVOCATIONS_TOTAL: &str = "roomlease_revocations_total";
    pub const DROPPED_MESSAGES_TOTAL: &str = "roomlease_dropped_messages_total";
    pub const PUBLISH_FAILURES_TOTAL: &str = "roomlease_publish_failures_total";
    pub const ACTIVE_LEASES: &str = "roomlease_active_leases";
    pub const QUEUED_REQUESTS: &str = "roomlease_queued_requests";
    /// 1 while the actuator holds a lease, 0 once revoked.
    pub const ACTUATOR_STATE: &str = "roomlease_actuator_state";
}

/// Register descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(names::REQUESTS_TOTAL, "Requests received, by outcome");
    describe_counter!(names::ACKS_TOTAL, "Actuator acknowledgements, by outcome");
    describe_counter!(names::EXPIRATIONS_TOTAL, "Lease timers fired, by outcome");
    describe_counter!(names::GRANTS_TOTAL, "Grants published, renewals included");
    describe_counter!(names::REVOCATIONS_TOTAL, "Leases revoked, by reason");
    describe_counter!(names::DROPPED_MESSAGES_TOTAL, "Malformed messages dropped");
    describe_counter!(names::PUBLISH_FAILURES_TOTAL, "Grant messages that failed to publish");
    describe_gauge!(names::ACTIVE_LEASES, "Leases currently held");
    describe_gauge!(names::QUEUED_REQUESTS, "Requests waiting for capacity");
    describe_gauge!(names::ACTUATOR_STATE, "Actuator lease state (1 held, 0 free)");
}

pub(crate) fn record_request(outcome: RequestOutcome) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome.label()).increment(1);
}

pub(crate) fn record_ack(outcome: AckOutcome) {
    counter!(names::ACKS_TOTAL, "outcome" => outcome.label()).increment(1);
}

pub(crate) fn record_expiry(outcome: ExpiryOutcome) {
    counter!(names::EXPIRATIONS_TOTAL, "outcome" => outcome.label()).increment(1);
}

pub(crate) fn record_grant(key: &DeviceKey) {
    counter!(names::GRANTS_TOTAL).increment(1);
    actuator_state(key).set(1.0);
}

pub(crate) fn record_revocation(key: &DeviceKey, reason: &'static str) {
    counter!(names::REVOCATIONS_TOTAL, "reason" => reason).increment(1);
    actuator_state(key).set(0.0);
}

pub(crate) fn record_dropped_message() {
    counter!(names::DROPPED_MESSAGES_TOTAL).increment(1);
}

pub(crate) fn record_publish_failure() {
    counter!(names::PUBLISH_FAILURES_TOTAL).increment(1);
}

pub(crate) fn record_occupancy(active: usize, queued: usize) {
    gauge!(names::ACTIVE_LEASES).set(saturating_f64(active));
    gauge!(names::QUEUED_REQUESTS).set(saturating_f64(queued));
}

fn actuator_state(key: &DeviceKey) -> metrics::Gauge {
    gauge!(
        names::ACTUATOR_STATE,
        "room_id" => key.room_id().to_string(),
        "actuator" => key.actuator().to_string()
    )
}

fn saturating_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
