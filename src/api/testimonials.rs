//! Testimonial API endpoints
//!
//! Public:
//! - GET /api/v1/testimonials
//!
//! Staff:
//! - GET|POST          /api/v1/admin/testimonials
//! - PUT               /api/v1/admin/testimonials/reorder
//! - GET|PUT|DELETE    /api/v1/admin/testimonials/{id}
//! - POST              /api/v1/admin/testimonials/{id}/toggle-publish

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::common::ReorderRequest;
use super::middleware::ApiError;
use super::AppState;
use crate::models::{CreateTestimonialInput, Testimonial, UpdateTestimonialInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_published))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_testimonials).post(create_testimonial))
        .route("/reorder", put(reorder))
        .route(
            "/{id}",
            get(get_testimonial)
                .put(update_testimonial)
                .delete(delete_testimonial),
        )
        .route("/{id}/toggle-publish", post(toggle_publish))
}

async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.testimonial_service.list_published().await?))
}

async fn list_testimonials(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.testimonial_service.list().await?))
}

async fn create_testimonial(
    State(state): State<AppState>,
    Json(body): Json<CreateTestimonialInput>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    let testimonial = state.testimonial_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

async fn get_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.testimonial_service.get(id).await?))
}

async fn update_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTestimonialInput>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.testimonial_service.update(id, body).await?))
}

async fn delete_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.testimonial_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.testimonial_service.toggle_publish(id).await?))
}

async fn reorder(
    State(state): State<AppState>,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.testimonial_service.reorder(&body.items).await?))
}
