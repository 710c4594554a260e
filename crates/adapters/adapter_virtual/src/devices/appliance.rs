//! One appliance of a simulated room: the room-side controller and the
//! physical actuator in one place.

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::message::BusMessage;
use roomlease_domain::payload::SwitchPayload;
use roomlease_domain::topic::{ack_topic, command_topic, request_topic};

use super::ApplianceKind;
use crate::config::Thresholds;

/// Room-side state of one appliance.
///
/// `wanted` is what the room asked the scheduler for, `running` is what the
/// actuator last executed.
#[derive(Debug, Clone)]
pub struct Appliance {
    kind: ApplianceKind,
    key: DeviceKey,
    band: Thresholds,
    wanted: bool,
    running: bool,
}

impl Appliance {
    #[must_use]
    pub fn new(kind: ApplianceKind, key: DeviceKey, band: Thresholds) -> Self {
        Self {
            kind,
            key,
            band,
            wanted: false,
            running: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ApplianceKind {
        self.kind
    }

    #[must_use]
    pub fn key(&self) -> &DeviceKey {
        &self.key
    }

    #[must_use]
    pub fn is_wanted(&self) -> bool {
        self.wanted
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A sensor reading arrived. Returns a request when the desire changed.
    pub fn on_reading(&mut self, value: f64) -> Option<BusMessage> {
        let wanted = self.kind.wants(value, self.band, self.wanted);
        if wanted == self.wanted {
            return None;
        }
        self.wanted = wanted;
        tracing::debug!(key = %self.key, value, wanted, "room demand changed");
        Some(self.request())
    }

    /// The scheduler granted or revoked the appliance.
    ///
    /// The room forwards the decision to the actuator as a command. A
    /// revocation while the room still wants the appliance re-issues the
    /// request, so the demand is queued again.
    pub fn on_grant(&mut self, granted: bool) -> Vec<BusMessage> {
        let mut out = vec![BusMessage::new(
            command_topic(&self.key),
            SwitchPayload { value: granted }.to_bytes(),
        )];
        if !granted && self.wanted {
            tracing::debug!(key = %self.key, "lease revoked while still wanted, asking again");
            out.push(self.request());
        }
        out
    }

    /// The actuator executes a command and acknowledges it.
    pub fn on_command(&mut self, on: bool) -> BusMessage {
        self.running = on;
        BusMessage::new(ack_topic(&self.key), SwitchPayload { value: on }.to_bytes())
    }

    fn request(&self) -> BusMessage {
        BusMessage::new(
            request_topic(&self.key),
            SwitchPayload { value: self.wanted }.to_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heater() -> Appliance {
        Appliance::new(
            ApplianceKind::Heater,
            DeviceKey::new("lab", "heater").unwrap(),
            Thresholds {
                min: 19.0,
                max: 22.0,
            },
        )
    }

    fn value(message: &BusMessage) -> bool {
        SwitchPayload::from_slice(&message.payload).unwrap().value
    }

    #[test]
    fn should_request_only_on_desire_change() {
        let mut appliance = heater();
        assert!(appliance.on_reading(20.0).is_none());

        let request = appliance.on_reading(18.0).unwrap();
        assert_eq!(request.topic, "room/lab/actuators/heater/request");
        assert!(value(&request));

        assert!(appliance.on_reading(17.0).is_none());
        assert!(appliance.on_reading(21.0).is_none());

        let request = appliance.on_reading(23.0).unwrap();
        assert!(!value(&request));
    }

    #[test]
    fn should_forward_grant_as_command() {
        let mut appliance = heater();
        appliance.on_reading(18.0);

        let out = appliance.on_grant(true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].topic, "room/lab/actuators/heater");
        assert!(value(&out[0]));
    }

    #[test]
    fn should_request_again_when_revoked_while_wanted() {
        let mut appliance = heater();
        appliance.on_reading(18.0);

        let out = appliance.on_grant(false);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].topic, "room/lab/actuators/heater");
        assert!(!value(&out[0]));
        assert_eq!(out[1].topic, "room/lab/actuators/heater/request");
        assert!(value(&out[1]));
    }

    #[test]
    fn should_not_request_again_when_revoked_after_demand_ended() {
        let mut appliance = heater();
        let out = appliance.on_grant(false);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn should_ack_executed_command() {
        let mut appliance = heater();
        let ack = appliance.on_command(true);
        assert!(appliance.is_running());
        assert_eq!(ack.topic, "room/lab/actuators/heater/ack");
        assert!(value(&ack));
    }
}
