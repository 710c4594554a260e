//! Scheduler event loop: the single thread of control.
//!
//! Inbound bus messages, lease expiries and the shutdown signal all travel
//! through one unbounded mpsc channel and are applied to the
//! [`AdmissionController`] strictly one at a time.

use std::time::Duration;

use tokio::sync::mpsc;

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::id::LeaseId;
use roomlease_domain::message::BusMessage;

use crate::ports::{Clock, LeaseTimer, MessagePublisher};
use crate::scheduler::{AdmissionController, SchedulerSnapshot};

/// Everything the scheduler reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A message received on a subscribed topic.
    Message(BusMessage),
    /// The timer of `lease` on `key` fired.
    LeaseExpired { key: DeviceKey, lease: LeaseId },
    /// Revoke everything and stop the loop.
    Shutdown,
}

/// Cloneable sending side of the scheduler's event queue.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl SchedulerHandle {
    /// Enqueue a bus message. Returns `false` once the loop has stopped.
    pub fn deliver(&self, message: BusMessage) -> bool {
        self.send(SchedulerEvent::Message(message))
    }

    /// Enqueue a lease expiry. Returns `false` once the loop has stopped.
    pub fn expire(&self, key: DeviceKey, lease: LeaseId) -> bool {
        self.send(SchedulerEvent::LeaseExpired { key, lease })
    }

    /// Ask the loop to revoke every lease and stop.
    pub fn shutdown(&self) -> bool {
        self.send(SchedulerEvent::Shutdown)
    }

    /// A handle that does not keep the loop running.
    #[must_use]
    pub fn downgrade(&self) -> WeakSchedulerHandle {
        WeakSchedulerHandle {
            tx: self.tx.downgrade(),
        }
    }

    fn send(&self, event: SchedulerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Non-owning counterpart of [`SchedulerHandle`]. The loop stops once every
/// strong handle is gone, whatever the number of weak ones.
#[derive(Debug, Clone)]
pub struct WeakSchedulerHandle {
    tx: mpsc::WeakUnboundedSender<SchedulerEvent>,
}

impl WeakSchedulerHandle {
    /// `None` once the loop can no longer receive events.
    #[must_use]
    pub fn upgrade(&self) -> Option<SchedulerHandle> {
        self.tx.upgrade().map(|tx| SchedulerHandle { tx })
    }
}

/// Receiving side of the scheduler's event queue, consumed by [`run`].
#[derive(Debug)]
pub struct SchedulerInbox {
    rx: mpsc::UnboundedReceiver<SchedulerEvent>,
}

impl SchedulerInbox {
    /// Wait for the next event. `None` once every handle is dropped.
    pub async fn recv(&mut self) -> Option<SchedulerEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<SchedulerEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create the scheduler's event queue.
#[must_use]
pub fn channel() -> (SchedulerHandle, SchedulerInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SchedulerHandle { tx }, SchedulerInbox { rx })
}

/// Apply one event. Returns `false` when the loop should stop.
pub fn apply<P, T, C>(controller: &mut AdmissionController<P, T, C>, event: SchedulerEvent) -> bool
where
    P: MessagePublisher,
    T: LeaseTimer,
    C: Clock,
{
    match event {
        SchedulerEvent::Message(message) => {
            tracing::trace!(topic = %message.topic, "message received");
            controller.dispatch(&message);
            true
        }
        SchedulerEvent::LeaseExpired { key, lease } => {
            controller.on_lease_expired(&key, lease);
            true
        }
        SchedulerEvent::Shutdown => false,
    }
}

/// Drive `controller` until [`SchedulerEvent::Shutdown`] arrives or every
/// handle is dropped, then revoke all leases and return the final snapshot.
///
/// When `status_every` is set, a status line with the active and queued
/// counts is logged at that interval.
pub async fn run<P, T, C>(
    mut controller: AdmissionController<P, T, C>,
    mut inbox: SchedulerInbox,
    status_every: Option<Duration>,
) -> SchedulerSnapshot
where
    P: MessagePublisher,
    T: LeaseTimer,
    C: Clock,
{
    let mut status = status_every.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval
    });

    tracing::info!(
        max_concurrent_leases = controller.config().max_concurrent_leases,
        lease_duration_ms = controller.config().lease_duration_ms,
        "scheduler started"
    );

    loop {
        tokio::select! {
            event = inbox.recv() => {
                let Some(event) = event else {
                    tracing::debug!("all scheduler handles dropped");
                    break;
                };
                if !apply(&mut controller, event) {
                    break;
                }
            }
            () = tick(status.as_mut()) => {
                log_status(&controller);
            }
        }
    }

    controller.shutdown();
    let snapshot = controller.snapshot();
    tracing::info!(stats = ?snapshot.stats, "scheduler stopped");
    snapshot
}

async fn tick(interval: Option<&mut tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn log_status<P, T, C>(controller: &AdmissionController<P, T, C>)
where
    P: MessagePublisher,
    T: LeaseTimer,
    C: Clock,
{
    let stats = controller.stats();
    tracing::info!(
        active = controller.active_count(),
        queued = controller.queued_count(),
        grants = stats.grants,
        expirations = stats.expirations,
        renewals = stats.renewals,
        rejected = stats.rejected,
        publish_failures = stats.publish_failures,
        "scheduler status"
    );
}
