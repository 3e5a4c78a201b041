//! Fee calculator API endpoints
//!
//! - POST /api/v1/estimate
//! - GET  /api/v1/estimate/options

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::middleware::ApiError;
use super::AppState;
use crate::services::{Estimate, EstimateInput, EstimateOptions};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(estimate))
        .route("/options", get(options))
}

async fn estimate(
    State(state): State<AppState>,
    Json(body): Json<EstimateInput>,
) -> Result<Json<Estimate>, ApiError> {
    Ok(Json(state.fee_calculator.estimate(&body)?))
}

async fn options(State(state): State<AppState>) -> Json<EstimateOptions> {
    Json(state.fee_calculator.options())
}
