//! Toy environment model: linear drift per tick, no physics.

use crate::config::DriftConfig;

/// Temperature and humidity of one room.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    temperature: f64,
    humidity: f64,
    drift: DriftConfig,
}

impl Environment {
    #[must_use]
    pub fn new(temperature: f64, humidity: f64, drift: DriftConfig) -> Self {
        Self {
            temperature,
            humidity,
            drift,
        }
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[must_use]
    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    /// Advance one tick. A running appliance pushes its reading one way,
    /// otherwise the reading relaxes toward ambient without overshooting.
    pub fn step(&mut self, heater_on: bool, dehumidifier_on: bool) {
        let drift = self.drift;
        self.temperature = if heater_on {
            self.temperature + drift.heating_rate
        } else {
            approach(self.temperature, drift.ambient_temperature, drift.cooling_rate)
        };
        self.humidity = if dehumidifier_on {
            self.humidity - drift.dehumidifying_rate
        } else {
            approach(self.humidity, drift.ambient_humidity, drift.humidity_rise_rate)
        }
        .clamp(0.0, 100.0);
    }
}

fn approach(current: f64, target: f64, rate: f64) -> f64 {
    if current < target {
        (current + rate).min(target)
    } else {
        (current - rate).max(target)
    }
}
