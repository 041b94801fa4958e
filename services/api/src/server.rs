use crate::cli::ServeArgs;
use crate::infra::{build_analysis_service, AppState, InMemoryReportCache};
use crate::routes::with_analysis_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use parcel_ai::config::AppConfig;
use parcel_ai::error::AppError;
use parcel_ai::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let analysis_service = Arc::new(
        build_analysis_service(&config.engine)?.with_cache(Arc::new(
            InMemoryReportCache::with_capacity(config.engine.report_cache_capacity),
        )),
    );
    let rulebook_version = analysis_service.rulebook_version().to_string();

    let app = with_analysis_routes(analysis_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %rulebook_version, "parcel analysis service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
