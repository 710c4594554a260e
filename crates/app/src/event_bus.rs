//! In-process message bus backed by a tokio broadcast channel.
//!
//! Stands in for the broker when everything runs in one process, and serves
//! as the local fan-out behind the MQTT adapter.

use tokio::sync::broadcast;

use roomlease_domain::error::RoomLeaseError;
use roomlease_domain::message::BusMessage;
use roomlease_domain::topic::matches_filter;

use crate::ports::MessagePublisher;
use crate::runtime::SchedulerHandle;

/// In-process bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the message is simply dropped). Cloning yields another handle on the
/// same channel.
#[derive(Debug, Clone)]
pub struct InProcessBus {
    sender: broadcast::Sender<BusMessage>,
}

impl InProcessBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to messages whose topic matches any of `filters`
    /// (MQTT wildcard syntax).
    ///
    /// The subscription only sees messages published *after* it is created.
    #[must_use]
    pub fn subscribe<I, S>(&self, filters: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Subscription {
            receiver: self.sender.subscribe(),
            filters: filters.into_iter().map(Into::into).collect(),
        }
    }

    /// Put an already-built message on the bus.
    pub fn send(&self, message: BusMessage) {
        // broadcast::send fails only when there are zero receivers.
        let _ = self.sender.send(message);
    }
}

impl MessagePublisher for InProcessBus {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RoomLeaseError> {
        self.send(BusMessage::new(topic, payload));
        Ok(())
    }
}

/// Filtered view of an [`InProcessBus`].
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<BusMessage>,
    filters: Vec<String>,
}

impl Subscription {
    /// Wait for the next matching message. `None` once every bus handle is
    /// dropped.
    ///
    /// A subscriber that falls behind loses the oldest messages; the loss is
    /// logged and reception continues.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if self.accepts(&message.topic) => return Some(message),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, filters = ?self.filters, "subscriber lagged, messages lost");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Feed every matching message into the scheduler until either side
    /// goes away.
    pub async fn forward_to(mut self, handle: SchedulerHandle) {
        while let Some(message) = self.recv().await {
            if !handle.deliver(message) {
                tracing::debug!("scheduler stopped, no longer forwarding");
                return;
            }
        }
    }

    fn accepts(&self, topic: &str) -> bool {
        self.filters
            .iter()
            .any(|filter| matches_filter(filter, topic))
    }
}
