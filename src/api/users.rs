//! User management API endpoints (admin only)
//!
//! - GET    /api/v1/admin/users
//! - POST   /api/v1/admin/users
//! - PUT    /api/v1/admin/users/{id}
//! - DELETE /api/v1/admin/users/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use super::common::PageQuery;
use super::middleware::{ApiError, AuthenticatedUser};
use super::AppState;
use crate::models::{CreateUserInput, PagedResult, UpdateUserInput, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    Ok(Json(state.user_service.list_users(&query.params()).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.create_user(body).await?;
    tracing::info!("User '{}' created with role {}", user.username, user.role);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.update_user(&actor.0, id, body).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_user(&actor.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
