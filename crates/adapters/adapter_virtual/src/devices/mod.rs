//! Simulated appliances and the threshold rules that decide when a room
//! wants them running.

mod appliance;

pub use appliance::Appliance;

use crate::config::Thresholds;

/// The appliances every simulated room has, each paired with the sensor it
/// reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplianceKind {
    Heater,
    Dehumidifier,
}

impl ApplianceKind {
    pub const ALL: [Self; 2] = [Self::Heater, Self::Dehumidifier];

    /// Actuator segment used in topics.
    #[must_use]
    pub fn actuator(self) -> &'static str {
        match self {
            Self::Heater => "heater",
            Self::Dehumidifier => "dehumidifier",
        }
    }

    /// Sensor segment whose readings drive this appliance.
    #[must_use]
    pub fn sensor(self) -> &'static str {
        match self {
            Self::Heater => "temperature",
            Self::Dehumidifier => "humidity",
        }
    }

    /// Whether the room wants the appliance running after reading `value`.
    /// Inside the comfort band the previous desire holds.
    #[must_use]
    pub fn wants(self, value: f64, band: Thresholds, currently: bool) -> bool {
        let (start, stop) = match self {
            Self::Heater => (value < band.min, value > band.max),
            Self::Dehumidifier => (value > band.max, value < band.min),
        };
        if start {
            true
        } else if stop {
            false
        } else {
            currently
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAND: Thresholds = Thresholds {
        min: 19.0,
        max: 22.0,
    };

    #[test]
    fn should_want_heater_below_min_and_not_above_max() {
        assert!(ApplianceKind::Heater.wants(18.5, BAND, false));
        assert!(!ApplianceKind::Heater.wants(22.5, BAND, true));
    }

    #[test]
    fn should_want_dehumidifier_above_max_and_not_below_min() {
        assert!(ApplianceKind::Dehumidifier.wants(22.5, BAND, false));
        assert!(!ApplianceKind::Dehumidifier.wants(18.5, BAND, true));
    }

    #[test]
    fn should_keep_previous_desire_inside_band() {
        for kind in ApplianceKind::ALL {
            assert!(kind.wants(20.0, BAND, true));
            assert!(!kind.wants(20.0, BAND, false));
            assert!(kind.wants(BAND.min, BAND, true));
            assert!(!kind.wants(BAND.max, BAND, false));
        }
    }
}
