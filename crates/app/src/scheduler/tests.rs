use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use roomlease_domain::payload::GrantPayload;
use roomlease_domain::time::{Timestamp, now};

use super::*;

// ── Spy publisher ──────────────────────────────────────────────

#[derive(Default)]
struct SpyPublisher {
    messages: Mutex<Vec<BusMessage>>,
}

impl SpyPublisher {
    fn grants(&self) -> Vec<(String, GrantPayload)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| {
                let key = m
                    .topic
                    .trim_start_matches("room/")
                    .replace("/actuators/", "/")
                    .trim_end_matches("/grant")
                    .to_string();
                (key, GrantPayload::from_slice(&m.payload).unwrap())
            })
            .collect()
    }

    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl MessagePublisher for SpyPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RoomLeaseError> {
        self.messages
            .lock()
            .unwrap()
            .push(BusMessage::new(topic, payload));
        Ok(())
    }
}

// ── Failing publisher ──────────────────────────────────────────

struct FailingPublisher;

impl MessagePublisher for FailingPublisher {
    fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), RoomLeaseError> {
        Err(RoomLeaseError::Transport(Box::new(std::io::Error::other(
            "broker unavailable",
        ))))
    }
}

// ── Manual timer ───────────────────────────────────────────────

#[derive(Default)]
struct ManualTimer {
    scheduled: Mutex<Vec<(DeviceKey, LeaseId, Duration)>>,
    cancelled: Mutex<HashSet<LeaseId>>,
}

impl ManualTimer {
    fn is_live(&self, lease: LeaseId) -> bool {
        let scheduled = self
            .scheduled
            .lock()
            .unwrap()
            .iter()
            .any(|(_, id, _)| *id == lease);
        scheduled && !self.cancelled.lock().unwrap().contains(&lease)
    }
}

impl LeaseTimer for ManualTimer {
    fn schedule(&self, key: &DeviceKey, lease: LeaseId, after: Duration) {
        self.scheduled
            .lock()
            .unwrap()
            .push((key.clone(), lease, after));
    }

    fn cancel(&self, lease: LeaseId) {
        self.cancelled.lock().unwrap().insert(lease);
    }
}

// ── Fixed clock ────────────────────────────────────────────────

struct FixedClock(Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

// ── Helpers ────────────────────────────────────────────────────

type TestController = AdmissionController<SpyPublisher, ManualTimer, FixedClock>;

fn controller(max_concurrent_leases: usize) -> TestController {
    controller_with(SchedulerConfig {
        max_concurrent_leases,
        ..SchedulerConfig::default()
    })
}

fn controller_with(config: SchedulerConfig) -> TestController {
    AdmissionController::new(
        config,
        SpyPublisher::default(),
        ManualTimer::default(),
        FixedClock(now()),
    )
    .unwrap()
}

fn key(name: &str) -> DeviceKey {
    DeviceKey::new("room1", name).unwrap()
}

fn lease_id(ctl: &TestController, name: &str) -> LeaseId {
    ctl.leases.get(&key(name)).unwrap().id
}

/// Fire the live timer of `name`'s current lease.
fn expire(ctl: &mut TestController, name: &str) -> ExpiryOutcome {
    let id = lease_id(ctl, name);
    assert!(ctl.timer.is_live(id), "lease of {name} has no live timer");
    ctl.on_lease_expired(&key(name), id)
}

fn active(ctl: &TestController) -> Vec<String> {
    ctl.snapshot()
        .active
        .iter()
        .map(|l| l.key.actuator().to_string())
        .collect()
}

fn queued(ctl: &TestController) -> Vec<String> {
    ctl.snapshot()
        .queued
        .iter()
        .map(|k| k.actuator().to_string())
        .collect()
}

fn message(topic: &str, payload: &str) -> BusMessage {
    BusMessage::new(topic, payload)
}

// ── Admission ──────────────────────────────────────────────────

#[test]
fn should_reject_invalid_config() {
    let result = AdmissionController::new(
        SchedulerConfig {
            max_concurrent_leases: 0,
            ..SchedulerConfig::default()
        },
        SpyPublisher::default(),
        ManualTimer::default(),
        FixedClock(now()),
    );
    assert!(matches!(result, Err(RoomLeaseError::Validation(_))));
}

#[test]
fn should_grant_immediately_when_capacity_is_free() {
    let mut ctl = controller(2);
    assert_eq!(ctl.on_request(key("a"), true), RequestOutcome::Granted);
    assert!(ctl.state_of(&key("a")).is_active());
    assert_eq!(
        ctl.publisher.grants(),
        vec![(
            "room1/a".to_string(),
            GrantPayload::granted(Duration::from_millis(10_000))
        )]
    );
}

#[test]
fn should_publish_grant_on_device_grant_topic() {
    let mut ctl = controller(1);
    ctl.on_request(key("heater"), true);
    let messages = ctl.publisher.messages.lock().unwrap();
    assert_eq!(messages[0].topic, "room/room1/actuators/heater/grant");
    assert_eq!(messages[0].payload, br#"{"value":true,"lease_ms":10000}"#);
}

#[test]
fn should_schedule_one_timer_per_grant_with_lease_duration() {
    let mut ctl = controller_with(SchedulerConfig {
        max_concurrent_leases: 2,
        lease_duration_ms: 2_500,
        ..SchedulerConfig::default()
    });
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    let scheduled = ctl.timer.scheduled.lock().unwrap();
    assert_eq!(scheduled.len(), 2);
    assert!(
        scheduled
            .iter()
            .all(|(_, _, after)| *after == Duration::from_millis(2_500))
    );
}

#[test]
fn should_queue_when_capacity_is_exhausted() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    assert_eq!(
        ctl.on_request(key("b"), true),
        RequestOutcome::Queued { position: 0 }
    );
    assert_eq!(
        ctl.on_request(key("c"), true),
        RequestOutcome::Queued { position: 1 }
    );
    assert_eq!(ctl.state_of(&key("c")), DeviceState::Queued { position: 1 });
    assert_eq!(ctl.active_count(), 1);
    assert_eq!(ctl.queued_count(), 2);
}

#[test]
fn should_admit_in_fifo_order() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    ctl.on_request(key("c"), true);
    assert_eq!(active(&ctl), vec!["a"]);

    assert_eq!(ctl.on_ack(&key("a"), false), AckOutcome::Released);

    assert_eq!(active(&ctl), vec!["b"]);
    assert_eq!(queued(&ctl), vec!["c"]);
}

// ── Round-robin continuation ───────────────────────────────────

#[test]
fn should_rotate_expired_lease_behind_waiters() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);

    assert_eq!(expire(&mut ctl, "a"), ExpiryOutcome::Rotated);

    assert_eq!(active(&ctl), vec!["b"]);
    assert_eq!(queued(&ctl), vec!["a"]);

    assert_eq!(expire(&mut ctl, "b"), ExpiryOutcome::Rotated);
    assert_eq!(active(&ctl), vec!["a"]);
    assert_eq!(queued(&ctl), vec!["b"]);
}

#[test]
fn should_keep_earlier_waiters_ahead_of_rotated_key() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    ctl.on_request(key("c"), true);

    expire(&mut ctl, "a");

    assert_eq!(active(&ctl), vec!["b"]);
    assert_eq!(queued(&ctl), vec!["c", "a"]);
}

#[test]
fn should_renew_expired_lease_when_nobody_waits() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    let first = lease_id(&ctl, "a");

    assert_eq!(expire(&mut ctl, "a"), ExpiryOutcome::Renewed);

    let second = lease_id(&ctl, "a");
    assert_ne!(first, second);
    assert!(ctl.timer.is_live(second));
    // no revocation between the two grants
    let values: Vec<bool> = ctl.publisher.grants().iter().map(|(_, g)| g.value).collect();
    assert_eq!(values, vec![true, true]);
    assert_eq!(ctl.stats().expirations, 1);
    assert_eq!(ctl.stats().renewals, 1);
    assert_eq!(ctl.stats().revocations, 0);
    assert!(ctl.queue.is_empty());
}

#[test]
fn should_keep_renewed_lease_after_late_ack_on() {
    let mut ctl = controller(2);
    ctl.on_request(key("a"), true);
    expire(&mut ctl, "a");

    // the actuator confirms the renewal grant and the room repeats its demand
    assert_eq!(ctl.on_ack(&key("a"), true), AckOutcome::Confirmed);
    assert_eq!(
        ctl.on_request(key("a"), true),
        RequestOutcome::DuplicateActive
    );
    assert!(ctl.state_of(&key("a")).is_active());
    assert_eq!(ctl.stats().grants, 2);
}

#[test]
fn should_rotate_instead_of_renewing_once_someone_waits() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    assert_eq!(expire(&mut ctl, "a"), ExpiryOutcome::Renewed);

    ctl.on_request(key("b"), true);
    assert_eq!(expire(&mut ctl, "a"), ExpiryOutcome::Rotated);
    assert_eq!(active(&ctl), vec!["b"]);
    assert_eq!(queued(&ctl), vec!["a"]);
}

#[test]
fn should_not_cancel_the_timer_that_fired() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    let id = lease_id(&ctl, "a");
    expire(&mut ctl, "a");
    assert!(!ctl.timer.cancelled.lock().unwrap().contains(&id));
}

#[test]
fn should_ignore_stale_expiry() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    let old = lease_id(&ctl, "a");
    ctl.on_ack(&key("a"), false);
    ctl.on_request(key("a"), true);

    let before = ctl.publisher.count();
    assert_eq!(ctl.on_lease_expired(&key("a"), old), ExpiryOutcome::Stale);
    assert_eq!(ctl.publisher.count(), before);
    assert!(ctl.state_of(&key("a")).is_active());
    assert_eq!(ctl.stats().stale_expiries, 1);
}

#[test]
fn should_ignore_expiry_for_unknown_key() {
    let mut ctl = controller(1);
    assert_eq!(
        ctl.on_lease_expired(&key("ghost"), LeaseId::new()),
        ExpiryOutcome::Stale
    );
    assert_eq!(ctl.state_of(&key("ghost")), DeviceState::Idle);
}

// ── Idempotent requests ────────────────────────────────────────

#[test]
fn should_treat_repeat_request_for_active_key_as_duplicate() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    let before = ctl.snapshot();
    let published = ctl.publisher.count();

    assert_eq!(ctl.on_request(key("a"), true), RequestOutcome::DuplicateActive);

    let after = ctl.snapshot();
    assert_eq!(after.active, before.active);
    assert_eq!(after.queued, before.queued);
    assert_eq!(ctl.publisher.count(), published);
    assert_eq!(ctl.stats().duplicate_active, 1);
    assert_eq!(ctl.stats().grants, 1);
}

#[test]
fn should_treat_repeat_request_for_queued_key_as_duplicate() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    ctl.on_request(key("c"), true);

    assert_eq!(ctl.on_request(key("b"), true), RequestOutcome::DuplicateQueued);
    assert_eq!(queued(&ctl), vec!["b", "c"]);
    assert_eq!(ctl.stats().duplicate_queued, 1);
}

// ── Off requests and ACKs ──────────────────────────────────────

#[test]
fn should_free_capacity_immediately_on_ack_off() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    let a_lease = lease_id(&ctl, "a");
    ctl.on_request(key("b"), true);

    ctl.on_ack(&key("a"), false);

    assert!(!ctl.timer.is_live(a_lease));
    assert_eq!(ctl.state_of(&key("a")), DeviceState::Idle);
    assert!(ctl.state_of(&key("b")).is_active());
    let grants = ctl.publisher.grants();
    assert_eq!(grants[1], ("room1/a".to_string(), GrantPayload::revoked()));
    assert!(grants[2].1.value);
    assert_eq!(grants[2].0, "room1/b");
}

#[test]
fn should_leave_queue_untouched_on_ack_off_for_queued_key() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    assert_eq!(ctl.on_ack(&key("b"), false), AckOutcome::NotHeld);
    assert_eq!(queued(&ctl), vec!["b"]);
}

#[test]
fn should_treat_ack_on_as_informational() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    let before = ctl.snapshot();
    let published = ctl.publisher.count();

    assert_eq!(ctl.on_ack(&key("a"), true), AckOutcome::Confirmed);
    assert_eq!(ctl.on_ack(&key("z"), true), AckOutcome::Unsolicited);

    assert_eq!(ctl.snapshot().active, before.active);
    assert_eq!(ctl.publisher.count(), published);
    assert_eq!(ctl.stats().unsolicited_acks, 1);
}

#[test]
fn should_release_lease_on_off_request_and_serve_next() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    let a_lease = lease_id(&ctl, "a");
    ctl.on_request(key("b"), true);

    assert_eq!(ctl.on_request(key("a"), false), RequestOutcome::Released);

    assert!(!ctl.timer.is_live(a_lease));
    assert_eq!(active(&ctl), vec!["b"]);
    assert!(queued(&ctl).is_empty());
}

#[test]
fn should_withdraw_queued_key_on_off_request() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    ctl.on_request(key("c"), true);

    assert_eq!(ctl.on_request(key("b"), false), RequestOutcome::Withdrawn);

    assert_eq!(queued(&ctl), vec!["c"]);
    assert_eq!(ctl.stats().withdrawn, 1);
}

#[test]
fn should_accept_off_request_for_idle_key() {
    let mut ctl = controller(1);
    assert_eq!(ctl.on_request(key("a"), false), RequestOutcome::AlreadyIdle);
    assert_eq!(ctl.on_request(key("a"), false), RequestOutcome::AlreadyIdle);
    assert_eq!(ctl.publisher.count(), 0);
}

// ── Bounded queue ──────────────────────────────────────────────

#[test]
fn should_reject_new_requests_when_queue_is_full() {
    let mut ctl = controller_with(SchedulerConfig {
        max_concurrent_leases: 1,
        max_queue_len: 1,
        ..SchedulerConfig::default()
    });
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);

    assert_eq!(ctl.on_request(key("c"), true), RequestOutcome::Rejected);

    assert_eq!(ctl.state_of(&key("c")), DeviceState::Idle);
    assert_eq!(ctl.stats().rejected, 1);
}

#[test]
fn should_rotate_expired_key_even_when_queue_is_full() {
    let mut ctl = controller_with(SchedulerConfig {
        max_concurrent_leases: 2,
        max_queue_len: 1,
        ..SchedulerConfig::default()
    });
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    ctl.on_request(key("c"), true);

    expire(&mut ctl, "a");

    assert_eq!(active(&ctl), vec!["b", "c"]);
    assert_eq!(queued(&ctl), vec!["a"]);
}

// ── Routing ────────────────────────────────────────────────────

#[test]
fn should_dispatch_request_and_ack_messages() {
    let mut ctl = controller(1);
    assert_eq!(
        ctl.dispatch(&message(
            "room/room1/actuators/a/request",
            r#"{"value":true}"#
        )),
        Some(Dispatched::Request(RequestOutcome::Granted))
    );
    assert_eq!(
        ctl.dispatch(&message("room/room1/actuators/a/ack", r#"{"value":false}"#)),
        Some(Dispatched::Ack(AckOutcome::Released))
    );
}

#[test]
fn should_drop_message_with_malformed_topic() {
    let mut ctl = controller(1);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    let before = ctl.snapshot();

    assert_eq!(
        ctl.dispatch(&message("room//actuators//request", r#"{"value":true}"#)),
        None
    );

    let after = ctl.snapshot();
    assert_eq!(after.active, before.active);
    assert_eq!(after.queued, before.queued);
    assert_eq!(ctl.stats().dropped_malformed, 1);
    assert_eq!(ctl.stats().requests, 2);
}

#[test]
fn should_drop_message_with_malformed_payload() {
    let mut ctl = controller(1);
    assert_eq!(
        ctl.dispatch(&message("room/room1/actuators/a/request", "{not json")),
        None
    );
    assert_eq!(ctl.state_of(&key("a")), DeviceState::Idle);
    assert_eq!(ctl.stats().dropped_malformed, 1);
}

#[test]
fn should_ignore_own_grant_echo() {
    let mut ctl = controller(1);
    assert_eq!(
        ctl.dispatch(&message("room/room1/actuators/a/grant", r#"{"value":true}"#)),
        None
    );
    assert_eq!(ctl.stats().dropped_malformed, 0);
    assert_eq!(ctl.publisher.count(), 0);
}

// ── Transport failures ─────────────────────────────────────────

#[test]
fn should_keep_state_when_publish_fails() {
    let mut ctl = AdmissionController::new(
        SchedulerConfig {
            max_concurrent_leases: 1,
            ..SchedulerConfig::default()
        },
        FailingPublisher,
        ManualTimer::default(),
        FixedClock(now()),
    )
    .unwrap();

    assert_eq!(ctl.on_request(key("a"), true), RequestOutcome::Granted);
    assert!(ctl.state_of(&key("a")).is_active());
    assert_eq!(ctl.on_request(key("a"), false), RequestOutcome::Released);
    assert_eq!(ctl.state_of(&key("a")), DeviceState::Idle);
    assert_eq!(ctl.stats().publish_failures, 2);
}

// ── Shutdown ───────────────────────────────────────────────────

#[test]
fn should_revoke_everything_on_shutdown() {
    let mut ctl = controller(2);
    ctl.on_request(key("a"), true);
    ctl.on_request(key("b"), true);
    ctl.on_request(key("c"), true);
    let ids = [lease_id(&ctl, "a"), lease_id(&ctl, "b")];

    ctl.shutdown();

    assert_eq!(ctl.active_count(), 0);
    assert_eq!(ctl.queued_count(), 0);
    assert!(ids.iter().all(|id| !ctl.timer.is_live(*id)));
    let revoked = ctl
        .publisher
        .grants()
        .into_iter()
        .filter(|(_, g)| !g.value)
        .count();
    assert_eq!(revoked, 2);
}

// ── Invariants under a long mixed workload ─────────────────────

#[test]
fn should_hold_capacity_and_membership_invariants() {
    let max = 2;
    let mut ctl = controller_with(SchedulerConfig {
        max_concurrent_leases: max,
        max_queue_len: 4,
        ..SchedulerConfig::default()
    });
    let names = ["a", "b", "c", "d", "e", "f"];
    // Small LCG so the sequence is deterministic without extra crates.
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        seed = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        usize::try_from(seed >> 33).unwrap()
    };

    for _ in 0..2_000 {
        let name = names[next() % names.len()];
        match next() % 5 {
            0 | 1 => {
                ctl.on_request(key(name), true);
            }
            2 => {
                ctl.on_request(key(name), false);
            }
            3 => {
                ctl.on_ack(&key(name), next() % 2 == 0);
            }
            _ => {
                if let Some(lease) = ctl.leases.get(&key(name)) {
                    let id = lease.id;
                    ctl.on_lease_expired(&key(name), id);
                }
            }
        }

        let snapshot = ctl.snapshot();
        assert!(snapshot.active.len() <= max);
        assert!(snapshot.is_consistent());
        for lease in &snapshot.active {
            assert!(ctl.timer.is_live(lease.id));
        }
        // Work-conserving: nobody waits while capacity is free.
        assert!(snapshot.queued.is_empty() || snapshot.active.len() == max);
    }
}
