//! A simulated room: sensors, threshold controllers and actuators reacting
//! to the bus traffic of a single room.

use roomlease_domain::device_key::DeviceKey;
use roomlease_domain::error::RoomLeaseError;
use roomlease_domain::message::BusMessage;
use roomlease_domain::payload::{GrantPayload, ReadingPayload, SwitchPayload};
use roomlease_domain::topic::{ActuatorTopic, TopicKind, command_topic, room_filter, sensor_topic};

use crate::config::{DriftConfig, RoomConfig};
use crate::devices::{Appliance, ApplianceKind};
use crate::environment::Environment;
use crate::error::SimulationError;

/// One room and its appliances.
///
/// The room is a pure state machine: [`handle`](Self::handle) and
/// [`tick`](Self::tick) return the messages it wants published.
#[derive(Debug, Clone)]
pub struct VirtualRoom {
    id: String,
    appliances: Vec<Appliance>,
    environment: Environment,
}

impl VirtualRoom {
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidRoom`] when the room id cannot be
    /// used in a topic.
    pub fn new(config: &RoomConfig, drift: DriftConfig) -> Result<Self, SimulationError> {
        let appliances = ApplianceKind::ALL
            .into_iter()
            .map(|kind| {
                let band = match kind {
                    ApplianceKind::Heater => config.temperature,
                    ApplianceKind::Dehumidifier => config.humidity,
                };
                DeviceKey::new(config.id.clone(), kind.actuator())
                    .map(|key| Appliance::new(kind, key, band))
                    .map_err(|source| SimulationError::InvalidRoom {
                        room: config.id.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: config.id.clone(),
            appliances,
            environment: Environment::new(
                config.initial_temperature,
                config.initial_humidity,
                drift,
            ),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Filter covering every topic of this room.
    #[must_use]
    pub fn filter(&self) -> String {
        room_filter(&self.id)
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    #[must_use]
    pub fn appliance(&self, kind: ApplianceKind) -> Option<&Appliance> {
        self.appliances.iter().find(|appliance| appliance.kind() == kind)
    }

    /// Advance the environment one tick and publish fresh readings.
    pub fn tick(&mut self) -> Vec<BusMessage> {
        let heater = self.is_running(ApplianceKind::Heater);
        let dehumidifier = self.is_running(ApplianceKind::Dehumidifier);
        self.environment.step(heater, dehumidifier);
        vec![
            self.reading(ApplianceKind::Heater, self.environment.temperature()),
            self.reading(ApplianceKind::Dehumidifier, self.environment.humidity()),
        ]
    }

    /// React to one message of this room. Messages the room does not care
    /// about, and malformed ones, produce nothing.
    pub fn handle(&mut self, message: &BusMessage) -> Vec<BusMessage> {
        match self.react(message) {
            Ok(out) => out,
            Err(err) => {
                tracing::debug!(room = %self.id, topic = %message.topic, error = ?err, "ignoring message");
                Vec::new()
            }
        }
    }

    fn react(&mut self, message: &BusMessage) -> Result<Vec<BusMessage>, RoomLeaseError> {
        let topic = message.topic.as_str();

        if let Some(appliance) = self
            .appliances
            .iter_mut()
            .find(|appliance| sensor_topic(appliance.key().room_id(), appliance.kind().sensor()) == topic)
        {
            let reading = ReadingPayload::from_slice(&message.payload)?;
            return Ok(appliance.on_reading(reading.value).into_iter().collect());
        }

        if let Some(appliance) = self
            .appliances
            .iter_mut()
            .find(|appliance| command_topic(appliance.key()) == topic)
        {
            let command = SwitchPayload::from_slice(&message.payload)?;
            tracing::info!(key = %appliance.key(), on = command.value, "actuator switched");
            return Ok(vec![appliance.on_command(command.value)]);
        }

        if !topic.ends_with(TopicKind::Grant.as_str()) {
            return Ok(Vec::new());
        }
        let ActuatorTopic { key, .. } = ActuatorTopic::parse(topic)?;
        let grant = GrantPayload::from_slice(&message.payload)?;
        Ok(self
            .appliances
            .iter_mut()
            .find(|appliance| *appliance.key() == key)
            .map(|appliance| appliance.on_grant(grant.value))
            .unwrap_or_default())
    }

    fn is_running(&self, kind: ApplianceKind) -> bool {
        self.appliance(kind).is_some_and(Appliance::is_running)
    }

    fn reading(&self, kind: ApplianceKind, value: f64) -> BusMessage {
        BusMessage::new(
            sensor_topic(&self.id, kind.sensor()),
            ReadingPayload { value }.to_bytes(),
        )
    }
}
