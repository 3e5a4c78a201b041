//! Practice area ("services") API endpoints
//!
//! Public:
//! - GET /api/v1/services
//! - GET /api/v1/services/{slug}
//!
//! Staff:
//! - GET|POST          /api/v1/admin/services
//! - PUT               /api/v1/admin/services/reorder
//! - GET|PUT|DELETE    /api/v1/admin/services/{id}
//! - POST              /api/v1/admin/services/{id}/toggle-active

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::common::ReorderRequest;
use super::middleware::ApiError;
use super::AppState;
use crate::models::{CreatePracticeAreaInput, PracticeArea, UpdatePracticeAreaInput};
use crate::services::PracticeAreaDetail;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_active))
        .route("/{slug}", get(get_active))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_areas).post(create_area))
        .route("/reorder", put(reorder))
        .route("/{id}", get(get_area).put(update_area).delete(delete_area))
        .route("/{id}/toggle-active", post(toggle_active))
}

async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<PracticeArea>>, ApiError> {
    Ok(Json(state.practice_area_service.list_active().await?))
}

async fn get_active(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PracticeAreaDetail>, ApiError> {
    Ok(Json(state.practice_area_service.get_active(&slug).await?))
}

async fn list_areas(State(state): State<AppState>) -> Result<Json<Vec<PracticeArea>>, ApiError> {
    Ok(Json(state.practice_area_service.list().await?))
}

async fn create_area(
    State(state): State<AppState>,
    Json(body): Json<CreatePracticeAreaInput>,
) -> Result<(StatusCode, Json<PracticeArea>), ApiError> {
    let area = state.practice_area_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(area)))
}

async fn get_area(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PracticeArea>, ApiError> {
    Ok(Json(state.practice_area_service.get(id).await?))
}

async fn update_area(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePracticeAreaInput>,
) -> Result<Json<PracticeArea>, ApiError> {
    Ok(Json(state.practice_area_service.update(id, body).await?))
}

async fn delete_area(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.practice_area_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PracticeArea>, ApiError> {
    Ok(Json(state.practice_area_service.toggle_active(id).await?))
}

async fn reorder(
    State(state): State<AppState>,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<Vec<PracticeArea>>, ApiError> {
    Ok(Json(state.practice_area_service.reorder(&body.items).await?))
}
