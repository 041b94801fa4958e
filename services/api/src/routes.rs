use crate::infra::{AnalysisService, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use parcel_ai::workflows::development::analysis_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_analysis_routes(service: Arc<AnalysisService>) -> axum::Router {
    analysis_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{build_analysis_service, InMemoryReportCache};
    use axum::body::Body;
    use axum::http::Request;
    use parcel_ai::config::EngineConfig;
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let service = build_analysis_service(&EngineConfig::default())
            .expect("service builds")
            .with_cache(Arc::new(InMemoryReportCache::default()));
        with_analysis_routes(Arc::new(service))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn health_route_reports_ok() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn analysis_route_is_mounted_alongside_operational_routes() {
        let response = router()
            .oneshot(
                Request::post("/api/v1/parcels/analysis")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "address": "2250 Oak Bay Ave",
                            "municipality": "Saanich",
                            "lot_size_sqft": 7200,
                            "zoning": "RS-6"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data_sources"]["property_data"], false);
        assert_eq!(body["rulebook_version"], "bc-2024.1");
        assert_eq!(body["plan"]["compliance"]["ssmuh_eligible"], true);
    }
}
