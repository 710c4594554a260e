use metrics_exporter_prometheus::BuildError;

/// Errors specific to the HTTP adapter.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to install metrics recorder")]
    Recorder(#[from] BuildError),
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("metrics server stopped")]
    Serve(#[source] std::io::Error),
}
