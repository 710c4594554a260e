//! Simulation error types.

use roomlease_domain::error::ValidationError;

/// Errors raised while setting up the simulated rooms.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("simulation tick must be greater than zero")]
    ZeroTick,

    /// The room id cannot be used as a topic segment.
    #[error("invalid room id {room:?}")]
    InvalidRoom {
        room: String,
        #[source]
        source: ValidationError,
    },

    #[error("room {room:?} is configured twice")]
    DuplicateRoom { room: String },

    #[error("room {room:?}: {sensor} thresholds need min < max (got {min} and {max})")]
    Thresholds {
        room: String,
        sensor: &'static str,
        min: f64,
        max: f64,
    },
}
