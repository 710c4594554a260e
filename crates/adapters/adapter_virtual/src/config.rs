//! Simulation configuration.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use roomlease_domain::device_key::DeviceKey;

use crate::devices::ApplianceKind;
use crate::error::SimulationError;

/// Configuration for the simulated rooms.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Whether the simulated rooms run at all.
    pub enabled: bool,
    /// Interval between sensor readings, in milliseconds.
    pub tick_ms: u64,
    pub drift: DriftConfig,
    pub rooms: Vec<RoomConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_ms: 1000,
            drift: DriftConfig::default(),
            rooms: vec![
                RoomConfig::new("living", 18.0, 55.0),
                RoomConfig::new("kitchen", 20.5, 58.0),
                RoomConfig::new("bedroom", 17.0, 45.0),
            ],
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Check every room before anything is spawned.
    ///
    /// # Errors
    ///
    /// Returns a [`SimulationError`] for a zero tick, a room id that cannot
    /// appear in a topic, a repeated room id, or thresholds with `min >= max`.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.tick_ms == 0 {
            return Err(SimulationError::ZeroTick);
        }
        let mut seen = HashSet::new();
        for room in &self.rooms {
            for kind in ApplianceKind::ALL {
                DeviceKey::new(room.id.clone(), kind.actuator()).map_err(|source| {
                    SimulationError::InvalidRoom {
                        room: room.id.clone(),
                        source,
                    }
                })?;
            }
            if !seen.insert(room.id.as_str()) {
                return Err(SimulationError::DuplicateRoom {
                    room: room.id.clone(),
                });
            }
            room.temperature.check(&room.id, "temperature")?;
            room.humidity.check(&room.id, "humidity")?;
        }
        Ok(())
    }
}

/// One simulated room.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub id: String,
    /// Heater runs below `min` and stops above `max`, in °C.
    pub temperature: Thresholds,
    /// Dehumidifier runs above `max` and stops below `min`, in %.
    pub humidity: Thresholds,
    pub initial_temperature: f64,
    pub initial_humidity: f64,
}

impl RoomConfig {
    #[must_use]
    pub fn new(id: impl Into<String>, initial_temperature: f64, initial_humidity: f64) -> Self {
        Self {
            id: id.into(),
            initial_temperature,
            initial_humidity,
            ..Self::default()
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            id: "room".to_string(),
            temperature: Thresholds {
                min: 19.0,
                max: 22.0,
            },
            humidity: Thresholds {
                min: 40.0,
                max: 50.0,
            },
            initial_temperature: 20.0,
            initial_humidity: 45.0,
        }
    }
}

/// Comfort band for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    pub min: f64,
    pub max: f64,
}

impl Thresholds {
    fn check(self, room: &str, sensor: &'static str) -> Result<(), SimulationError> {
        if self.min < self.max {
            Ok(())
        } else {
            Err(SimulationError::Thresholds {
                room: room.to_string(),
                sensor,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Per-tick rates of the toy environment model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Temperature a room settles at with the heater off, in °C.
    pub ambient_temperature: f64,
    pub heating_rate: f64,
    pub cooling_rate: f64,
    /// Humidity a room settles at with the dehumidifier off, in %.
    pub ambient_humidity: f64,
    pub dehumidifying_rate: f64,
    pub humidity_rise_rate: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            ambient_temperature: 15.0,
            heating_rate: 0.5,
            cooling_rate: 0.2,
            ambient_humidity: 65.0,
            dehumidifying_rate: 1.0,
            humidity_rise_rate: 0.3,
        }
    }
}
