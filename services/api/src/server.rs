use crate::cli::ServeArgs;
use crate::infra::{AppState, BackendMode};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use wav_portal::backend::{Backend, InMemoryBackend, RestBackend};
use wav_portal::config::AppConfig;
use wav_portal::error::AppError;
use wav_portal::telemetry;
use wav_portal::PortalState;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    match config.backend.clone() {
        Some(backend_config) => {
            let backend = RestBackend::new(&backend_config)?;
            info!(url = %backend_config.url, "using remote backend");
            serve(config, Arc::new(backend), BackendMode::Remote).await
        }
        None => {
            warn!("BACKEND_URL not set; accounts and applications are kept in memory");
            serve(
                config,
                Arc::new(InMemoryBackend::default()),
                BackendMode::InMemory,
            )
            .await
        }
    }
}

async fn serve<B>(config: AppConfig, backend: Arc<B>, mode: BackendMode) -> Result<(), AppError>
where
    B: Backend + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        backend: mode,
    };

    let portal = PortalState::with_wizard_ttl(backend, config.registration.wizard_ttl);
    let app = with_portal_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, backend = mode.label(), "student portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
