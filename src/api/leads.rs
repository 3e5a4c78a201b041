//! Lead pipeline API endpoints
//!
//! - GET|POST          /api/v1/leads
//! - GET               /api/v1/leads/board
//! - GET|PUT|DELETE    /api/v1/leads/{id}
//! - PATCH             /api/v1/leads/{id}/status
//! - GET|POST          /api/v1/leads/{id}/interactions
//! - POST              /api/v1/leads/{id}/notes
//! - DELETE            /api/v1/leads/{id}/notes/{note_id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::middleware::{ApiError, AuthenticatedUser};
use super::AppState;
use crate::models::{
    BoardColumn, CreateInteractionInput, CreateLeadInput, Lead, LeadFilter, LeadInteraction,
    LeadNote, ListParams, PagedResult, UpdateLeadInput,
};
use crate::services::lead::{parse_status, LeadDetail, StatusChange};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_leads).post(create_lead))
        .route("/board", get(board))
        .route("/{id}", get(get_lead).put(update_lead).delete(delete_lead))
        .route("/{id}/status", patch(move_status))
        .route(
            "/{id}/interactions",
            get(list_interactions).post(add_interaction),
        )
        .route("/{id}/notes", post(add_note))
        .route("/{id}/notes/{note_id}", delete(delete_note))
}

#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    pub status: Option<String>,
    pub owner_id: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MoveStatusRequest {
    pub status: String,
    pub lost_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: String,
}

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<PagedResult<Lead>>, ApiError> {
    let filter = LeadFilter {
        status: query.status.as_deref().map(parse_status).transpose()?,
        owner_id: query.owner_id,
        search: query.search,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.lead_service.list(&filter, &params).await?))
}

async fn board(State(state): State<AppState>) -> Result<Json<Vec<BoardColumn>>, ApiError> {
    Ok(Json(state.lead_service.board().await?))
}

async fn create_lead(
    State(state): State<AppState>,
    Json(body): Json<CreateLeadInput>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let lead = state.lead_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeadDetail>, ApiError> {
    Ok(Json(state.lead_service.get(id).await?))
}

async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateLeadInput>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.lead_service.update(id, body).await?))
}

async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lead_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/leads/{id}/status - Kanban drop
async fn move_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<MoveStatusRequest>,
) -> Result<Json<StatusChange>, ApiError> {
    let change = state
        .lead_service
        .move_status(id, &body.status, body.lost_reason, Some(user.0.id))
        .await?;
    Ok(Json(change))
}

async fn list_interactions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<LeadInteraction>>, ApiError> {
    Ok(Json(state.lead_service.list_interactions(id).await?))
}

async fn add_interaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CreateInteractionInput>,
) -> Result<(StatusCode, Json<LeadInteraction>), ApiError> {
    let interaction = state
        .lead_service
        .add_interaction(id, body, Some(user.0.id))
        .await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

async fn add_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<NoteRequest>,
) -> Result<(StatusCode, Json<LeadNote>), ApiError> {
    let note = state
        .lead_service
        .add_note(id, &body.content, Some(user.0.id))
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn delete_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.lead_service.delete_note(id, note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
