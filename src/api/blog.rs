//! Blog API endpoints
//!
//! Public:
//! - GET /api/v1/blog/posts
//! - GET /api/v1/blog/posts/{slug}
//! - GET /api/v1/blog/categories
//!
//! Staff:
//! - GET|POST          /api/v1/admin/blog/posts
//! - GET|PUT|DELETE    /api/v1/admin/blog/posts/{id}
//! - POST              /api/v1/admin/blog/posts/{id}/toggle-publish

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::common::StatusQuery;
use super::middleware::{ApiError, AuthenticatedUser};
use super::AppState;
use crate::models::{BlogPost, CategoryCount, CreatePostInput, ListParams, PagedResult, UpdatePostInput};
use crate::services::{PostDetail, PublicPostQuery};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_published))
        .route("/posts/{slug}", get(get_published))
        .route("/categories", get(categories))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/toggle-publish", post(toggle_publish))
}

#[derive(Debug, Deserialize)]
pub struct PublicListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn list_published(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Result<Json<PagedResult<BlogPost>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let filter = PublicPostQuery {
        category: query.category,
        tag: query.tag,
        search: query.search,
    };
    Ok(Json(state.blog_service.list_published(&filter, &params).await?))
}

async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(state.blog_service.get_published(&slug).await?))
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    Ok(Json(state.blog_service.categories().await?))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PagedResult<BlogPost>>, ApiError> {
    let posts = state
        .blog_service
        .list(query.status.as_deref(), query.search.clone(), &query.params())
        .await?;
    Ok(Json(posts))
}

async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    let post = state.blog_service.create(body, Some(user.0.id)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.blog_service.get(id).await?))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.blog_service.update(id, body).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.blog_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.blog_service.toggle_publish(id).await?))
}
