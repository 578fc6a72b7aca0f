//! HTTP handler functions for the AQI monitor API.

use actix_web::{HttpResponse, web};
use aqi_monitor_report::ReportError;
use aqi_monitor_server_models::{ApiError, ApiHealth, ApiWardReport};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/ward-analysis/{ward_id}`
///
/// Returns the assembled analysis report for one ward.
pub async fn ward_analysis(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let ward_id = path.into_inner();

    match state.reports.ward_report(&ward_id).await {
        Ok(report) => HttpResponse::Ok().json(ApiWardReport::from(report)),
        Err(e @ ReportError::InvalidWard) => {
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
        Err(e @ ReportError::WardNotFound { .. }) => {
            HttpResponse::NotFound().json(ApiError::new(e.to_string()))
        }
        Err(e) => {
            log::error!("Ward analysis for {ward_id} failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Internal server error"))
        }
    }
}
