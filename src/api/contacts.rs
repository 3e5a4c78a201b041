//! Contact form API endpoints
//!
//! Public:
//! - POST /api/v1/contacts
//!
//! Staff:
//! - GET          /api/v1/contacts
//! - GET|DELETE   /api/v1/contacts/{id}
//! - PATCH        /api/v1/contacts/{id}/status
//! - POST         /api/v1/contacts/{id}/convert

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::common::StatusQuery;
use super::middleware::{check_form_rate, extract_ip_address, ApiError};
use super::AppState;
use crate::models::{Contact, CreateContactInput, Lead, PagedResult};

/// Staff inbox routes. The public `POST /contacts` is registered on the
/// public tier alongside these, see `build_api_router`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts))
        .route("/{id}", get(get_contact).delete(delete_contact))
        .route("/{id}/status", patch(set_status))
        .route("/{id}/convert", post(convert))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// What the visitor gets back; the stored record stays private
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: i64,
    pub message: String,
}

pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateContactInput>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    check_form_rate(&state, &headers).await?;
    let ip = extract_ip_address(&headers).map(|ip| ip.to_string());
    let contact = state.contact_service.submit(body, ip).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: contact.id,
            message: "Thank you, we will be in touch shortly".to_string(),
        }),
    ))
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PagedResult<Contact>>, ApiError> {
    let contacts = state
        .contact_service
        .list(query.status.as_deref(), &query.params())
        .await?;
    Ok(Json(contacts))
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Contact>, ApiError> {
    Ok(Json(state.contact_service.get(id).await?))
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<Contact>, ApiError> {
    Ok(Json(state.contact_service.set_status(id, &body.status).await?))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.contact_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn convert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let lead = state.contact_service.convert(id).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}
