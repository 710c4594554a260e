//! Topic routing: classify actuator topics and extract their [`DeviceKey`].
//!
//! Actuator topics follow `room/<room>/actuators/<actuator>/<kind>` where
//! `<kind>` is `request`, `ack` or `grant`. The physical command channel is
//! the bare `room/<room>/actuators/<actuator>` topic and sensor readings live
//! under `room/<room>/sensors/<sensor>`.

use std::fmt;
use std::str::FromStr;

use crate::device_key::DeviceKey;
use crate::error::TopicError;

const ROOM: &str = "room";
const ACTUATORS: &str = "actuators";
const SENSORS: &str = "sensors";

/// Subscription filter for every room's actuator requests.
pub const REQUEST_FILTER: &str = "room/+/actuators/+/request";

/// Subscription filter for every room's actuator acknowledgements.
pub const ACK_FILTER: &str = "room/+/actuators/+/ack";

/// Filters the scheduler subscribes to.
pub const SCHEDULER_FILTERS: [&str; 2] = [REQUEST_FILTER, ACK_FILTER];

/// What an actuator topic carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// Desired state published by a room.
    Request,
    /// Executed state reported by an actuator.
    Ack,
    /// Admission decision published by the scheduler.
    Grant,
}

impl TopicKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Ack => "ack",
            Self::Grant => "grant",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicKind {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "ack" => Ok(Self::Ack),
            "grant" => Ok(Self::Grant),
            other => Err(TopicError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A parsed actuator topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActuatorTopic {
    pub key: DeviceKey,
    pub kind: TopicKind,
}

impl ActuatorTopic {
    #[must_use]
    pub fn new(key: DeviceKey, kind: TopicKind) -> Self {
        Self { key, kind }
    }

    /// Parse `room/<room>/actuators/<actuator>/<kind>` by fixed positions.
    ///
    /// # Errors
    ///
    /// Returns a [`TopicError`] when the segment count or the fixed segments
    /// do not match, when the room or actuator segment is empty or invalid,
    /// or when `<kind>` is unknown.
    pub fn parse(topic: &str) -> Result<Self, TopicError> {
        let segments: Vec<&str> = topic.split('/').collect();
        let [root, room_id, actuators, actuator, kind] = segments.as_slice() else {
            return Err(TopicError::UnexpectedShape {
                topic: topic.to_string(),
            });
        };
        if *root != ROOM || *actuators != ACTUATORS {
            return Err(TopicError::UnexpectedShape {
                topic: topic.to_string(),
            });
        }
        let key = DeviceKey::new(*room_id, *actuator).map_err(|_| TopicError::InvalidSegment {
            topic: topic.to_string(),
        })?;
        let kind = kind.parse()?;
        Ok(Self { key, kind })
    }
}

impl fmt::Display for ActuatorTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ROOM}/{}/{ACTUATORS}/{}/{}",
            self.key.room_id(),
            self.key.actuator(),
            self.kind
        )
    }
}

/// Topic the scheduler publishes grants and revocations on.
#[must_use]
pub fn grant_topic(key: &DeviceKey) -> String {
    ActuatorTopic::new(key.clone(), TopicKind::Grant).to_string()
}

/// Topic a room publishes its desired actuator state on.
#[must_use]
pub fn request_topic(key: &DeviceKey) -> String {
    ActuatorTopic::new(key.clone(), TopicKind::Request).to_string()
}

/// Topic an actuator confirms its executed state on.
#[must_use]
pub fn ack_topic(key: &DeviceKey) -> String {
    ActuatorTopic::new(key.clone(), TopicKind::Ack).to_string()
}

/// Physical command topic an actuator listens on.
#[must_use]
pub fn command_topic(key: &DeviceKey) -> String {
    format!("{ROOM}/{}/{ACTUATORS}/{}", key.room_id(), key.actuator())
}

/// Topic a room sensor publishes its readings on.
#[must_use]
pub fn sensor_topic(room_id: &str, sensor: &str) -> String {
    format!("{ROOM}/{room_id}/{SENSORS}/{sensor}")
}

/// Filter matching every topic of one room.
#[must_use]
pub fn room_filter(room_id: &str) -> String {
    format!("{ROOM}/{room_id}/#")
}

/// MQTT-style filter matching: `+` matches one level, a trailing `#` matches
/// the parent level and everything below it.
#[must_use]
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
