use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::providers::{PropertyDataProvider, RegulatoryProvider};
use super::report::AnalysisRequest;
use super::service::{AnalysisError, ParcelAnalysisService};

/// Router builder exposing the parcel analysis endpoints.
pub fn analysis_router<P, R>(service: Arc<ParcelAnalysisService<P, R>>) -> Router
where
    P: PropertyDataProvider + 'static,
    R: RegulatoryProvider + 'static,
{
    Router::new()
        .route("/api/v1/parcels/analysis", post(analysis_handler::<P, R>))
        .route(
            "/api/v1/parcels/reports/:cache_key",
            get(cached_report_handler::<P, R>),
        )
        .with_state(service)
}

pub(crate) async fn analysis_handler<P, R>(
    State(service): State<Arc<ParcelAnalysisService<P, R>>>,
    axum::Json(request): axum::Json<AnalysisRequest>,
) -> Response
where
    P: PropertyDataProvider + 'static,
    R: RegulatoryProvider + 'static,
{
    match service.analyze(request).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error @ AnalysisError::MissingAddress) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn cached_report_handler<P, R>(
    State(service): State<Arc<ParcelAnalysisService<P, R>>>,
    Path(cache_key): Path<String>,
) -> Response
where
    P: PropertyDataProvider + 'static,
    R: RegulatoryProvider + 'static,
{
    match service.cached(&cache_key) {
        Some(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        None => {
            let payload = json!({
                "cache_key": cache_key,
                "error": "report not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}
