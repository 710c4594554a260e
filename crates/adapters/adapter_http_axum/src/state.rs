//! Shared state for axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;

/// Render handle of the Prometheus recorder. Cheap to clone.
#[derive(Clone)]
pub struct MetricsState {
    handle: PrometheusHandle,
}

impl MetricsState {
    #[must_use]
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Every recorded metric in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
