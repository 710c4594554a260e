//! Publisher port: fire-and-forget publishing of `(topic, payload)` messages.

use roomlease_domain::error::RoomLeaseError;

/// Publishes raw messages on the bus.
///
/// Implementations must not block: the call hands the message to the
/// transport and returns. A returned error means the transport refused the
/// message right away (disconnected, queue full); delivery failures that
/// happen later are only observed by the transport itself.
pub trait MessagePublisher {
    /// Hand `payload` to the transport for delivery on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`RoomLeaseError::Transport`] when the transport refused the message.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RoomLeaseError>;
}

impl<T: MessagePublisher + ?Sized> MessagePublisher for std::sync::Arc<T> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RoomLeaseError> {
        (**self).publish(topic, payload)
    }
}

impl<T: MessagePublisher + ?Sized> MessagePublisher for &T {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RoomLeaseError> {
        (**self).publish(topic, payload)
    }
}
