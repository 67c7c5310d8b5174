//! Public site information API
//!
//! Version, health and lightweight request statistics. No authentication.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::middleware::AppState;

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub name: String,
    pub version: String,
    pub public_url: String,
}

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_us: f64,
}

/// GET /api/v1/site/info - Get public site information
pub async fn get_site_info(State(state): State<AppState>) -> Json<SiteInfoResponse> {
    Json(SiteInfoResponse {
        name: state.config.smtp.from_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        public_url: state.config.server.public_url.clone(),
    })
}

/// GET /api/v1/site/health - Liveness check with request statistics
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.request_stats.uptime_seconds(),
        total_requests: state.request_stats.total_requests(),
        avg_response_time_us: state.request_stats.avg_response_time_us(),
    })
}
