use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCandidateRepository};
use crate::routes::with_candidate_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use candidate_tracker::candidates::CandidateService;
use candidate_tracker::config::{AppConfig, ExportConfig};
use candidate_tracker::error::AppError;
use candidate_tracker::export::{ExportOrchestrator, ResultStore};
use candidate_tracker::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// Wire the result store, the orchestrator and the candidate service from config.
pub(crate) fn build_service(
    config: &ExportConfig,
    repository: Arc<InMemoryCandidateRepository>,
) -> CandidateService<InMemoryCandidateRepository> {
    let limits = config.limits();
    let store = Arc::new(ResultStore::new(limits.expiration()));
    let exports = ExportOrchestrator::new(store, limits, config.max_concurrent_exports as usize);
    CandidateService::new(repository, exports)
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryCandidateRepository::default());
    let candidate_service = Arc::new(build_service(&config.export, repository));
    let sweeper = candidate_service
        .exports()
        .spawn_sweeper(config.export.sweep_interval());

    let app = with_candidate_routes(candidate_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        csv_max = config.export.csv_max,
        excel_max = config.export.excel_max,
        pdf_max = config.export.pdf_max,
        expiration_minutes = config.export.expiration_minutes,
        "candidate tracker ready"
    );

    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;
    Ok(())
}
