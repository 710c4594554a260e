//! # roomleased: room lease daemon
//!
//! Composition root that wires the scheduler to a bus and runs it.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Pick the transport: in-process broadcast bus, or an MQTT broker with a
//!   local fan-out for the subscribers in this process
//! - Start the scheduler event loop, its lease timer and the simulated rooms
//! - Serve Prometheus metrics over HTTP
//! - Handle graceful shutdown (Ctrl-C): revoke every lease, then stop
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no scheduling logic belongs here.

mod config;

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use roomlease_adapter_http_axum::{HttpError, MetricsConfig};
use roomlease_adapter_virtual::VirtualRooms;
use roomlease_app::event_bus::InProcessBus;
use roomlease_app::ports::{MessagePublisher, SystemClock};
use roomlease_app::runtime::{self, SchedulerHandle};
use roomlease_app::scheduler::{AdmissionController, SchedulerSnapshot};
use roomlease_app::timer::TokioLeaseTimer;
use roomlease_domain::topic::SCHEDULER_FILTERS;

use crate::config::{BusKind, Config};

/// How long the MQTT event loop gets to flush the final revocations.
const MQTT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);
    let metrics = start_metrics(&config.metrics).await?;

    // Every subscriber in this process reads from the local bus.
    let local = InProcessBus::new(config.bus.capacity);

    let snapshot = match config.bus.kind {
        BusKind::InProcess => {
            tracing::info!("using in-process bus");
            serve(&config, local.clone(), &local).await?
        }
        BusKind::Mqtt => {
            tracing::info!(
                host = %config.bus.mqtt.broker_host,
                port = config.bus.mqtt.broker_port,
                "using MQTT bus"
            );
            // The simulated rooms need their own topics as well.
            let filters: Vec<&str> = if config.simulation.enabled {
                vec!["room/#"]
            } else {
                SCHEDULER_FILTERS.to_vec()
            };
            let (publisher, pump) = roomlease_adapter_mqtt::connect(&config.bus.mqtt, filters);
            let fanout = local.clone();
            let pump = tokio::spawn(pump.run(move |message| {
                fanout.send(message);
                true
            }));

            let snapshot = serve(&config, publisher.clone(), &local).await?;

            if let Err(err) = publisher.disconnect() {
                tracing::warn!(error = ?err, "failed to request MQTT disconnect");
            }
            if tokio::time::timeout(MQTT_FLUSH_TIMEOUT, pump).await.is_err() {
                tracing::warn!("MQTT event loop did not stop in time");
            }
            snapshot
        }
    };

    if let Some(metrics) = metrics {
        metrics.stop().await;
    }

    tracing::info!(
        grants = snapshot.stats.grants,
        revocations = snapshot.stats.revocations,
        expirations = snapshot.stats.expirations,
        "roomleased stopped"
    );
    Ok(())
}

/// Run the scheduler (and the simulated rooms, when enabled) until Ctrl-C.
async fn serve<P>(
    config: &Config,
    publisher: P,
    local: &InProcessBus,
) -> Result<SchedulerSnapshot, Box<dyn std::error::Error>>
where
    P: MessagePublisher + Clone + Send + Sync + 'static,
{
    let (handle, inbox) = runtime::channel();
    let timer = TokioLeaseTimer::new(handle.clone());
    let controller =
        AdmissionController::new(config.scheduler.clone(), publisher.clone(), timer, SystemClock)?;

    let forwarder = tokio::spawn(local.subscribe(SCHEDULER_FILTERS).forward_to(handle.clone()));
    let rooms = if config.simulation.enabled {
        Some(VirtualRooms::start(&config.simulation, local, publisher)?)
    } else {
        None
    };
    let signal = tokio::spawn(shutdown_on_ctrl_c(handle));

    let snapshot = runtime::run(controller, inbox, config.scheduler.status_interval()).await;

    signal.abort();
    forwarder.abort();
    if let Some(rooms) = rooms {
        rooms.teardown();
    }
    Ok(snapshot)
}

async fn shutdown_on_ctrl_c(handle: SchedulerHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("interrupt received, shutting down");
            handle.shutdown();
        }
        Err(err) => tracing::error!(error = %err, "failed to listen for interrupt"),
    }
}

/// Background `/metrics` server.
struct MetricsServer {
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), HttpError>>,
}

impl MetricsServer {
    async fn stop(self) {
        let _ = self.stop.send(());
        match self.task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = ?err, "metrics server failed"),
            Err(err) => tracing::warn!(error = %err, "metrics server task failed"),
        }
    }
}

async fn start_metrics(config: &MetricsConfig) -> Result<Option<MetricsServer>, HttpError> {
    if !config.enabled {
        tracing::debug!("metrics endpoint disabled");
        return Ok(None);
    }
    let state = roomlease_adapter_http_axum::install_recorder()?;
    let listener = roomlease_adapter_http_axum::bind(config).await?;
    let (stop, stopped) = oneshot::channel();
    let task = tokio::spawn(roomlease_adapter_http_axum::serve(listener, state, async move {
        let _ = stopped.await;
    }));
    Ok(Some(MetricsServer { stop, task }))
}

fn init_tracing(directives: &str) {
    let (filter, invalid) = log_filter(directives);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    if let Some(err) = invalid {
        tracing::warn!(filter = directives, error = %err, "invalid log filter, falling back to info");
    }
}

/// Parse `directives`, falling back to `info` and returning the parse error.
fn log_filter(directives: &str) -> (EnvFilter, Option<ParseError>) {
    match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    }
}
