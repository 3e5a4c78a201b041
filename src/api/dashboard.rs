//! Staff dashboard
//!
//! - GET /api/v1/admin/dashboard

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::middleware::ApiError;
use super::AppState;
use crate::services::DashboardStats;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub request_count: u64,
    pub avg_response_ms: f64,
    pub uptime_seconds: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let stats = state.dashboard_service.stats().await?;
    Ok(Json(DashboardResponse {
        stats,
        request_count: state.request_stats.total_requests(),
        avg_response_ms: state.request_stats.avg_response_time_ms(),
        uptime_seconds: state.request_stats.uptime_seconds(),
    }))
}
