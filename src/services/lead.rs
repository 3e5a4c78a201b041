//! Lead service
//!
//! The CRM pipeline behind the admin Kanban board. Leads move between a
//! fixed set of status columns; every move is recorded in the lead's
//! interaction timeline.

use crate::db::repositories::{LeadRepository, StatusTransition, UserRepository};
use crate::models::{
    BoardColumn, CreateInteractionInput, CreateLeadInput, InteractionKind, Lead, LeadFilter,
    LeadInteraction, LeadNote, LeadStatus, ListParams, PagedResult, UpdateLeadInput,
};
use crate::services::error::{clean_optional, is_valid_email, require_text, ServiceError, ServiceResult};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// A lead with its timeline
#[derive(Debug, Clone, Serialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    /// Newest first
    pub interactions: Vec<LeadInteraction>,
    /// Newest first
    pub notes: Vec<LeadNote>,
}

/// Result of a board move
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub lead: Lead,
    /// False when the lead already had the target status
    pub changed: bool,
}

pub struct LeadService {
    lead_repo: Arc<dyn LeadRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl LeadService {
    pub fn new(lead_repo: Arc<dyn LeadRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { lead_repo, user_repo }
    }

    pub async fn list(&self, filter: &LeadFilter, params: &ListParams) -> ServiceResult<PagedResult<Lead>> {
        let (leads, total) = self
            .lead_repo
            .list(filter, params)
            .await
            .context("Failed to list leads")?;
        Ok(PagedResult::new(leads, total, params))
    }

    /// One column per status in pipeline order, empty columns included
    pub async fn board(&self) -> ServiceResult<Vec<BoardColumn>> {
        let leads = self.lead_repo.list_all().await.context("Failed to load board")?;
        Ok(group_into_columns(leads))
    }

    pub async fn create(&self, input: CreateLeadInput) -> ServiceResult<Lead> {
        require_text("name", &input.name)?;
        validate_email(&input.email)?;
        validate_value(input.estimated_value)?;
        self.ensure_owner(input.owner_id).await?;

        let lead = new_lead(input);
        let created = self.lead_repo.create(&lead).await.context("Failed to create lead")?;
        tracing::info!("Lead {} created from {}", created.id, created.source);
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<LeadDetail> {
        let lead = self.require(id).await?;
        let interactions = self
            .lead_repo
            .list_interactions(id)
            .await
            .context("Failed to load interactions")?;
        let notes = self.lead_repo.list_notes(id).await.context("Failed to load notes")?;
        Ok(LeadDetail {
            lead,
            interactions,
            notes,
        })
    }

    /// Update everything except the status, which only moves through the board
    pub async fn update(&self, id: i64, input: UpdateLeadInput) -> ServiceResult<Lead> {
        let mut lead = self.require(id).await?;

        if let Some(name) = input.name {
            require_text("name", &name)?;
            lead.name = name.trim().to_string();
        }
        if let Some(email) = input.email {
            validate_email(&email)?;
            lead.email = email.trim().to_lowercase();
        }
        if input.phone.is_some() {
            lead.phone = clean_optional(input.phone);
        }
        if input.company.is_some() {
            lead.company = clean_optional(input.company);
        }
        if input.service_interest.is_some() {
            lead.service_interest = clean_optional(input.service_interest);
        }
        if input.message.is_some() {
            lead.message = clean_optional(input.message);
        }
        if let Some(source) = input.source {
            lead.source = source;
        }
        if input.estimated_value.is_some() {
            validate_value(input.estimated_value)?;
            lead.estimated_value = input.estimated_value;
        }
        if input.owner_id.is_some() {
            self.ensure_owner(input.owner_id).await?;
            lead.owner_id = input.owner_id;
        }
        if input.lost_reason.is_some() {
            if lead.status != LeadStatus::Lost {
                return Err(ServiceError::validation(
                    "A lost reason can only be set on a lost lead",
                ));
            }
            lead.lost_reason = clean_optional(input.lost_reason);
        }

        let updated = self.lead_repo.update(&lead).await.context("Failed to update lead")?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.require(id).await?;
        self.lead_repo.delete(id).await.context("Failed to delete lead")?;
        Ok(())
    }

    /// Move a lead to another board column.
    ///
    /// Only the status and the fields derived from it change. Moving to the
    /// current status is a no-op reported with `changed: false`.
    pub async fn move_status(
        &self,
        id: i64,
        target: &str,
        lost_reason: Option<String>,
        author_id: Option<i64>,
    ) -> ServiceResult<StatusChange> {
        let to = parse_status(target)?;
        let lead = self.require(id).await?;
        let from = lead.status;

        if from == to {
            return Ok(StatusChange {
                lead,
                changed: false,
            });
        }

        let transition = StatusTransition {
            lead_id: id,
            to,
            closed_at: to.is_closed().then(Utc::now),
            lost_reason: match to {
                LeadStatus::Lost => clean_optional(lost_reason).or(lead.lost_reason),
                _ => None,
            },
            summary: format!("{} → {}", from, to),
            author_id,
        };
        let moved = self
            .lead_repo
            .apply_transition(&transition)
            .await
            .context("Failed to change lead status")?;

        tracing::info!("Lead {} moved {} -> {}", id, from, to);
        Ok(StatusChange {
            lead: moved,
            changed: true,
        })
    }

    pub async fn add_interaction(
        &self,
        lead_id: i64,
        input: CreateInteractionInput,
        author_id: Option<i64>,
    ) -> ServiceResult<LeadInteraction> {
        self.require(lead_id).await?;
        if input.kind == InteractionKind::StatusChange {
            return Err(ServiceError::validation(
                "status_change entries are recorded by moving the lead",
            ));
        }
        require_text("summary", &input.summary)?;

        let now = Utc::now();
        let interaction = LeadInteraction {
            id: 0,
            lead_id,
            kind: input.kind,
            summary: input.summary.trim().to_string(),
            author_id,
            occurred_at: input.occurred_at.unwrap_or(now),
            created_at: now,
        };
        let created = self
            .lead_repo
            .add_interaction(&interaction)
            .await
            .context("Failed to add interaction")?;
        Ok(created)
    }

    pub async fn list_interactions(&self, lead_id: i64) -> ServiceResult<Vec<LeadInteraction>> {
        self.require(lead_id).await?;
        let interactions = self
            .lead_repo
            .list_interactions(lead_id)
            .await
            .context("Failed to list interactions")?;
        Ok(interactions)
    }

    pub async fn add_note(&self, lead_id: i64, content: &str, author_id: Option<i64>) -> ServiceResult<LeadNote> {
        self.require(lead_id).await?;
        require_text("content", content)?;

        let note = LeadNote {
            id: 0,
            lead_id,
            content: content.trim().to_string(),
            author_id,
            created_at: Utc::now(),
        };
        let created = self.lead_repo.add_note(&note).await.context("Failed to add note")?;
        Ok(created)
    }

    /// Delete a note; it must belong to `lead_id`
    pub async fn delete_note(&self, lead_id: i64, note_id: i64) -> ServiceResult<()> {
        let note = self
            .lead_repo
            .get_note(note_id)
            .await
            .context("Failed to get note")?
            .filter(|note| note.lead_id == lead_id)
            .ok_or_else(|| ServiceError::not_found("Note"))?;
        self.lead_repo
            .delete_note(note.id)
            .await
            .context("Failed to delete note")?;
        Ok(())
    }

    /// Lead count for every status, zeros included
    pub async fn counts_by_status(&self) -> ServiceResult<Vec<(LeadStatus, i64)>> {
        let counts = self
            .lead_repo
            .count_by_status()
            .await
            .context("Failed to count leads")?;
        Ok(LeadStatus::ALL
            .iter()
            .map(|status| {
                let count = counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                (*status, count)
            })
            .collect())
    }

    async fn require(&self, id: i64) -> ServiceResult<Lead> {
        self.lead_repo
            .get_by_id(id)
            .await
            .context("Failed to get lead")?
            .ok_or_else(|| ServiceError::not_found("Lead"))
    }

    async fn ensure_owner(&self, owner_id: Option<i64>) -> ServiceResult<()> {
        if let Some(owner_id) = owner_id {
            let owner = self
                .user_repo
                .get_by_id(owner_id)
                .await
                .context("Failed to get owner")?;
            if owner.is_none() {
                return Err(ServiceError::validation(format!("Unknown owner {}", owner_id)));
            }
        }
        Ok(())
    }
}

/// Build an unsaved `new` lead from input
pub(crate) fn new_lead(input: CreateLeadInput) -> Lead {
    let now = Utc::now();
    Lead {
        id: 0,
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        phone: clean_optional(input.phone),
        company: clean_optional(input.company),
        service_interest: clean_optional(input.service_interest),
        message: clean_optional(input.message),
        source: input.source,
        status: LeadStatus::New,
        estimated_value: input.estimated_value,
        owner_id: input.owner_id,
        contact_id: input.contact_id,
        lost_reason: None,
        created_at: now,
        updated_at: now,
        closed_at: None,
    }
}

/// Parse a board column, listing the valid values on failure
pub fn parse_status(value: &str) -> ServiceResult<LeadStatus> {
    LeadStatus::from_str(value).map_err(|_| {
        ServiceError::validation(format!(
            "Invalid status '{}'. Valid values: {}",
            value,
            LeadStatus::values().join(", ")
        ))
    })
}

/// Group leads (already ordered) into one column per status
fn group_into_columns(leads: Vec<Lead>) -> Vec<BoardColumn> {
    let mut columns: Vec<BoardColumn> = LeadStatus::ALL
        .iter()
        .map(|status| BoardColumn {
            status: *status,
            count: 0,
            leads: Vec::new(),
        })
        .collect();

    for lead in leads {
        if let Some(column) = columns.iter_mut().find(|c| c.status == lead.status) {
            column.leads.push(lead);
        }
    }
    for column in &mut columns {
        column.count = column.leads.len();
    }
    columns
}

fn validate_email(email: &str) -> ServiceResult<()> {
    if !is_valid_email(email) {
        return Err(ServiceError::validation("Invalid email format"));
    }
    Ok(())
}

fn validate_value(value: Option<f64>) -> ServiceResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ServiceError::validation(
            "estimated_value must be a non-negative number",
        )),
        _ => Ok(()),
    }
}
