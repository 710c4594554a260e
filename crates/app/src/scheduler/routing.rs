//! Message routing: turn a raw bus message into a scheduler input.
//!
//! Stateless: the topic decides the kind and the device key, the payload
//! carries the boolean.

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::error::RoomLeaseError;
use roomlease_domain::message::BusMessage;
use roomlease_domain::payload::SwitchPayload;
use roomlease_domain::topic::{ActuatorTopic, TopicKind};

/// A routed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Request { key: DeviceKey, desired_on: bool },
    Ack { key: DeviceKey, reported_on: bool },
    /// One of the scheduler's own grants echoed back by the bus.
    Grant { key: DeviceKey },
}

/// Classify `message` by topic and decode its payload.
///
/// # Errors
///
/// Returns [`RoomLeaseError::Topic`] when the topic does not have the
/// actuator shape, or [`RoomLeaseError::Payload`] when a request or ack body
/// is not `{"value": bool}`.
pub fn route(message: &BusMessage) -> Result<Inbound, RoomLeaseError> {
    let ActuatorTopic { key, kind } = ActuatorTopic::parse(&message.topic)?;
    let inbound = match kind {
        TopicKind::Request => Inbound::Request {
            desired_on: SwitchPayload::from_slice(&message.payload)?.value,
            key,
        },
        TopicKind::Ack => Inbound::Ack {
            reported_on: SwitchPayload::from_slice(&message.payload)?.value,
            key,
        },
        TopicKind::Grant => Inbound::Grant { key },
    };
    Ok(inbound)
}
