//! # roomlease-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade used by
//!   the scheduler
//! - Serve `/metrics` (Prometheus text format) and `/health`
//!
//! ## Dependency rule
//! Depends on `roomlease-app` for the metric descriptions only. The
//! scheduler never sees an axum or exporter type.

mod config;
mod error;
pub mod router;
pub mod state;

pub use config::MetricsConfig;
pub use error::HttpError;

use std::future::Future;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;

use crate::state::MetricsState;

/// Install the global Prometheus recorder and describe every scheduler
/// metric.
///
/// # Errors
///
/// Returns [`HttpError::Recorder`] when a global recorder is already
/// installed.
pub fn install_recorder() -> Result<MetricsState, HttpError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    roomlease_app::metrics::describe();
    tracing::info!("prometheus recorder installed");
    Ok(MetricsState::new(handle))
}

/// Bind the metrics listener.
///
/// # Errors
///
/// Returns [`HttpError::Bind`] when the address cannot be bound.
pub async fn bind(config: &MetricsConfig) -> Result<TcpListener, HttpError> {
    let addr = config.bind_addr();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| HttpError::Bind { addr, source })
}

/// Serve metrics on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`HttpError::Serve`] when the server stops on an IO error.
pub async fn serve<F>(listener: TcpListener, state: MetricsState, shutdown: F) -> Result<(), HttpError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "metrics server listening");
    }
    axum::serve(listener, router::build(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(HttpError::Serve)
}
