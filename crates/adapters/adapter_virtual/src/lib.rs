//! # roomlease-adapter-virtual
//!
//! Simulated rooms that exercise the scheduler for demonstration and
//! testing.
//!
//! ## Provided appliances
//!
//! | Appliance | Sensor | Wanted on | Wanted off |
//! |-----------|--------|-----------|------------|
//! | `heater` | `temperature` | below `temperature.min` | above `temperature.max` |
//! | `dehumidifier` | `humidity` | above `humidity.max` | below `humidity.min` |
//!
//! Each room publishes sensor readings every tick, requests an appliance
//! whenever its desire changes, turns grants into actuator commands and
//! acknowledges every executed command.
//!
//! ## Dependency rule
//!
//! Depends on `roomlease-app` (ports, in-process bus) and `roomlease-domain`
//! only.

mod config;
pub mod devices;
pub mod environment;
mod error;
pub mod room;

pub use config::{DriftConfig, RoomConfig, SimulationConfig, Thresholds};
pub use error::SimulationError;
pub use room::VirtualRoom;

use std::time::Duration;

use tokio::task::JoinHandle;

use roomlease_app::event_bus::{InProcessBus, Subscription};
use roomlease_app::ports::MessagePublisher;
use roomlease_domain::message::BusMessage;

/// Running simulation: one task per room.
pub struct VirtualRooms {
    tasks: Vec<JoinHandle<()>>,
}

impl VirtualRooms {
    /// Spawn every configured room.
    ///
    /// Rooms receive their traffic from `inbox` (a local bus, fed directly
    /// by the scheduler or by an MQTT subscription) and publish through
    /// `publisher`.
    ///
    /// # Errors
    ///
    /// Returns a [`SimulationError`] when the configuration is invalid;
    /// nothing is spawned in that case.
    pub fn start<P>(
        config: &SimulationConfig,
        inbox: &InProcessBus,
        publisher: P,
    ) -> Result<Self, SimulationError>
    where
        P: MessagePublisher + Clone + Send + Sync + 'static,
    {
        config.validate()?;
        let rooms = config
            .rooms
            .iter()
            .map(|room| VirtualRoom::new(room, config.drift))
            .collect::<Result<Vec<_>, _>>()?;

        let tick = config.tick();
        let tasks = rooms
            .into_iter()
            .map(|room| {
                let subscription = inbox.subscribe([room.filter()]);
                tracing::info!(room = room.id(), "virtual room started");
                tokio::spawn(run_room(room, subscription, publisher.clone(), tick))
            })
            .collect();

        Ok(Self { tasks })
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every room.
    pub fn teardown(self) {
        for task in &self.tasks {
            task.abort();
        }
        tracing::info!(rooms = self.tasks.len(), "virtual rooms stopped");
    }
}

async fn run_room<P: MessagePublisher>(
    mut room: VirtualRoom,
    mut subscription: Subscription,
    publisher: P,
    tick: Duration,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        let out = tokio::select! {
            message = subscription.recv() => {
                let Some(message) = message else {
                    tracing::debug!(room = room.id(), "bus closed, room stopping");
                    return;
                };
                room.handle(&message)
            }
            _ = interval.tick() => room.tick(),
        };
        publish_all(&publisher, room.id(), out);
    }
}

fn publish_all<P: MessagePublisher>(publisher: &P, room: &str, messages: Vec<BusMessage>) {
    for BusMessage { topic, payload } in messages {
        if let Err(err) = publisher.publish(&topic, payload) {
            tracing::warn!(room, %topic, error = ?err, "room failed to publish");
        }
    }
}
