use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Operational state shared with the health, readiness and metrics routes.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) backend: BackendMode,
}

/// Which backend adapter the server was started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendMode {
    Remote,
    InMemory,
}

impl BackendMode {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            BackendMode::Remote => "remote",
            BackendMode::InMemory => "in-memory",
        }
    }
}
