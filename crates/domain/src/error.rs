//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RoomLeaseError`] via `#[from]` when crossing a port boundary.

/// Top-level error shared by the domain, the application layer and the ports.
#[derive(Debug, thiserror::Error)]
pub enum RoomLeaseError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("malformed topic")]
    Topic(#[from] TopicError),

    #[error("malformed payload")]
    Payload(#[from] PayloadError),

    /// The message bus refused or failed an operation.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A value violated a domain invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("room id must not be empty")]
    EmptyRoomId,

    #[error("actuator name must not be empty")]
    EmptyActuator,

    /// Identifiers become topic segments, so they must not contain
    /// separators or wildcards.
    #[error("identifier {value:?} contains a reserved character")]
    ReservedCharacter { value: String },

    #[error("device key {value:?} is not of the form room/actuator")]
    DeviceKeyShape { value: String },

    #[error("max_concurrent_leases must be at least 1")]
    ZeroCapacity,

    #[error("lease_duration_ms must be between 1 and {max}, got {actual}")]
    LeaseDuration { actual: u64, max: u64 },

    #[error("max_queue_len must be at least 1")]
    ZeroQueueLength,
}

/// An inbound topic could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("topic {topic:?} does not match room/<room>/actuators/<actuator>/<kind>")]
    UnexpectedShape { topic: String },

    #[error("topic {topic:?} has an empty or invalid room or actuator segment")]
    InvalidSegment { topic: String },

    #[error("unknown message kind {kind:?}")]
    UnknownKind { kind: String },
}

/// An inbound payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid JSON payload")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_root_error() {
        let err: RoomLeaseError = ValidationError::EmptyRoomId.into();
        assert!(matches!(
            err,
            RoomLeaseError::Validation(ValidationError::EmptyRoomId)
        ));
    }

    #[test]
    fn should_convert_topic_error_into_root_error() {
        let err: RoomLeaseError = TopicError::UnknownKind {
            kind: "status".to_string(),
        }
        .into();
        assert!(matches!(err, RoomLeaseError::Topic(_)));
    }

    #[test]
    fn should_display_shape_error_with_topic() {
        let err = TopicError::UnexpectedShape {
            topic: "room/a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "topic \"room/a\" does not match room/<room>/actuators/<actuator>/<kind>"
        );
    }

    #[test]
    fn should_keep_json_error_as_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad").unwrap_err();
        let err: RoomLeaseError = PayloadError::Json(json_err).into();
        assert_eq!(err.to_string(), "malformed payload");
        assert!(std::error::Error::source(&err).is_some());
    }
}
