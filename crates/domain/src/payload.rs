//! Wire payloads carried on actuator and sensor topics.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

/// `{ "value": bool }`: body of `request`, `ack` and command messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPayload {
    pub value: bool,
}

impl SwitchPayload {
    /// Decode from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Json`] when the bytes are not a JSON object
    /// with a boolean `value`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        encode(&self)
    }
}

/// `{ "value": bool, "lease_ms"?: number }`: body of `grant` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPayload {
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_ms: Option<u64>,
}

impl GrantPayload {
    /// A grant valid for `lease`.
    #[must_use]
    pub fn granted(lease: Duration) -> Self {
        Self {
            value: true,
            lease_ms: Some(u64::try_from(lease.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// A revocation.
    #[must_use]
    pub fn revoked() -> Self {
        Self {
            value: false,
            lease_ms: None,
        }
    }

    /// Decode from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Json`] on malformed JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        encode(&self)
    }
}

/// `{ "value": number }`: body of sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub value: f64,
}

impl ReadingPayload {
    /// Decode from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Json`] on malformed JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        encode(&self)
    }
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // Plain structs of bools and numbers always serialize.
    serde_json::to_vec(value).unwrap_or_default()
}
