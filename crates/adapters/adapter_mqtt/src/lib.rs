//! # roomlease-adapter-mqtt
//!
//! MQTT adapter: carries scheduler traffic over a broker.
//!
//! [`connect`] builds a `rumqttc` client and splits it in two halves:
//! - [`MqttPublisher`] implements the `MessagePublisher` port. Publishing is
//!   QoS 1 and never blocks: the message is queued on the client and a full
//!   queue surfaces as an error right away.
//! - [`MqttEventLoop`] drives the connection. Every `ConnAck` re-issues the
//!   subscriptions, every incoming publish is handed to a callback as a
//!   [`BusMessage`], and connection errors are logged and retried.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `roomlease-app` and `roomlease-domain`.

mod config;
mod error;

pub use config::MqttConfig;
pub use error::MqttError;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Outgoing, Packet, QoS};

use roomlease_app::ports::MessagePublisher;
use roomlease_domain::error::RoomLeaseError;
use roomlease_domain::message::BusMessage;

/// Build a client for `config` that subscribes to `filters` on every
/// (re)connection. Nothing touches the network until the event loop runs.
pub fn connect<I, S>(config: &MqttConfig, filters: I) -> (MqttPublisher, MqttEventLoop)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let (client, eventloop) = AsyncClient::new(config.options(), config.channel_capacity);
    let publisher = MqttPublisher {
        client: client.clone(),
    };
    let pump = MqttEventLoop {
        client,
        eventloop,
        filters: filters.into_iter().map(Into::into).collect(),
        reconnect_delay: config.reconnect_delay(),
    };
    (publisher, pump)
}

/// Publishing half of the MQTT client.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Queue a disconnect behind every message already published. The event
    /// loop stops once it has sent it.
    ///
    /// # Errors
    ///
    /// Returns [`RoomLeaseError::Transport`] when the client refused the
    /// request.
    pub fn disconnect(&self) -> Result<(), RoomLeaseError> {
        self.client.try_disconnect().map_err(MqttError::Client)?;
        Ok(())
    }
}

impl MessagePublisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RoomLeaseError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(MqttError::Client)?;
        Ok(())
    }
}

/// Connection-driving half of the MQTT client.
pub struct MqttEventLoop {
    client: AsyncClient,
    eventloop: EventLoop,
    filters: Vec<String>,
    reconnect_delay: std::time::Duration,
}

impl MqttEventLoop {
    /// Topic filters subscribed on every connection.
    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Poll the connection forever, handing every incoming publish to
    /// `on_message`.
    ///
    /// Returns when `on_message` returns `false`, after a requested
    /// disconnect has been sent, or when every client handle has been
    /// dropped.
    pub async fn run<F>(mut self, mut on_message: F)
    where
        F: FnMut(BusMessage) -> bool,
    {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!(code = ?ack.code, "MQTT connected");
                    self.subscribe_all();
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = BusMessage::new(publish.topic, publish.payload.to_vec());
                    if !on_message(message) {
                        tracing::debug!("MQTT consumer stopped");
                        return;
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    tracing::debug!(pkid = ack.pkid, "MQTT subscription acknowledged");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::info!("MQTT disconnected");
                    return;
                }
                Ok(_) => {}
                Err(ConnectionError::RequestsDone) => {
                    tracing::debug!("MQTT client dropped, event loop stopping");
                    return;
                }
                Err(err) => {
                    let err = MqttError::Connection(err);
                    tracing::warn!(
                        error = ?err,
                        retry_in_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                        "MQTT connection failed"
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn subscribe_all(&self) {
        for filter in &self.filters {
            match self.client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                Ok(()) => tracing::debug!(%filter, "MQTT subscribe requested"),
                Err(err) => {
                    tracing::warn!(%filter, error = ?MqttError::Client(err), "MQTT subscribe failed");
                }
            }
        }
    }
}
