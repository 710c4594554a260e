//! Device key: the `(room, actuator)` pair identifying a schedulable resource.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable identifier of one actuator in one room, rendered as `room/actuator`.
///
/// Both parts become topic segments, so they are checked on construction and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceKey {
    room_id: String,
    actuator: String,
}

impl DeviceKey {
    /// Build a key from its two parts.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when either part is empty or contains a
    /// topic separator (`/`) or wildcard (`+`, `#`).
    pub fn new(
        room_id: impl Into<String>,
        actuator: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let room_id = room_id.into();
        let actuator = actuator.into();
        if room_id.is_empty() {
            return Err(ValidationError::EmptyRoomId);
        }
        if actuator.is_empty() {
            return Err(ValidationError::EmptyActuator);
        }
        for part in [&room_id, &actuator] {
            if part.contains(['/', '+', '#']) {
                return Err(ValidationError::ReservedCharacter {
                    value: part.clone(),
                });
            }
        }
        Ok(Self { room_id, actuator })
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn actuator(&self) -> &str {
        &self.actuator
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.room_id, self.actuator)
    }
}

impl FromStr for DeviceKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (room_id, actuator) = s
            .split_once('/')
            .ok_or_else(|| ValidationError::DeviceKeyShape {
                value: s.to_string(),
            })?;
        Self::new(room_id, actuator)
    }
}

impl TryFrom<String> for DeviceKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceKey> for String {
    fn from(key: DeviceKey) -> Self {
        key.to_string()
    }
}
