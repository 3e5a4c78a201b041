//! Newsletter API endpoints
//!
//! Public:
//! - POST /api/v1/newsletter/subscribe
//! - POST /api/v1/newsletter/unsubscribe
//!
//! Staff:
//! - GET    /api/v1/admin/newsletter/subscribers
//! - DELETE /api/v1/admin/newsletter/subscribers/{id}
//! - GET    /api/v1/admin/newsletter/export

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::common::{MessageResponse, StatusQuery};
use super::middleware::{check_form_rate, ApiError};
use super::AppState;
use crate::models::{PagedResult, Subscriber};
use crate::services::SubscribeInput;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/subscribers", get(list_subscribers))
        .route("/subscribers/{id}", delete(delete_subscriber))
        .route("/export", get(export))
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub token: String,
}

/// Subscribe result. An address that was already active gets only the flag,
/// so anonymous callers cannot read back another subscriber's record.
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub already_subscribed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<Subscriber>,
    /// Token for `POST /newsletter/unsubscribe`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribe_token: Option<String>,
}

async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubscribeInput>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    check_form_rate(&state, &headers).await?;
    let outcome = state.newsletter_service.subscribe(body).await?;
    if outcome.already_subscribed {
        let response = SubscribeResponse {
            already_subscribed: true,
            subscriber: None,
            unsubscribe_token: None,
        };
        return Ok((StatusCode::OK, Json(response)));
    }

    let token = outcome.subscriber.token.clone();
    let response = SubscribeResponse {
        already_subscribed: false,
        subscriber: Some(outcome.subscriber),
        unsubscribe_token: Some(token),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.newsletter_service.unsubscribe(&body.token).await?;
    Ok(Json(MessageResponse::new("You have been unsubscribed")))
}

async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PagedResult<Subscriber>>, ApiError> {
    let subscribers = state
        .newsletter_service
        .list(query.status.as_deref(), &query.params())
        .await?;
    Ok(Json(subscribers))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.newsletter_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/newsletter/export - CSV download
async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let csv = state.newsletter_service.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"subscribers.csv\"",
            ),
        ],
        csv,
    ))
}
