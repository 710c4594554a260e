//! MQTT adapter error types.

use roomlease_domain::error::RoomLeaseError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The client refused a request (outgoing queue full or event loop gone).
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The connection to the broker failed.
    #[error("MQTT connection error")]
    Connection(#[source] rumqttc::ConnectionError),
}

impl From<MqttError> for RoomLeaseError {
    fn from(err: MqttError) -> Self {
        RoomLeaseError::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_connection_error() {
        let err = MqttError::Connection(rumqttc::ConnectionError::RequestsDone);
        assert_eq!(err.to_string(), "MQTT connection error");
    }

    #[test]
    fn should_convert_into_transport_error() {
        let err: RoomLeaseError = MqttError::Connection(rumqttc::ConnectionError::RequestsDone).into();
        assert!(matches!(err, RoomLeaseError::Transport(_)));
    }

    #[test]
    fn should_keep_source_chain() {
        let err = MqttError::Connection(rumqttc::ConnectionError::RequestsDone);
        assert!(std::error::Error::source(&err).is_some());
    }
}
