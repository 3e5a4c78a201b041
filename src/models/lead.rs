//! Lead model
//!
//! A lead is a prospective client moving through the sales pipeline. The
//! pipeline statuses double as the columns of the admin Kanban board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// Practice area the prospect asked about
    pub service_interest: Option<String>,
    pub message: Option<String>,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub estimated_value: Option<f64>,
    /// Staff member responsible for the lead
    pub owner_id: Option<i64>,
    /// Contact submission this lead was converted from
    pub contact_id: Option<i64>,
    pub lost_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while the lead is won or lost
    pub closed_at: Option<DateTime<Utc>>,
}

string_enum! {
    /// Pipeline status, in board order
    pub enum LeadStatus {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Proposal => "proposal",
        Negotiation => "negotiation",
        Won => "won",
        Lost => "lost",
    }
}

impl LeadStatus {
    /// Won and lost leads are closed
    pub fn is_closed(&self) -> bool {
        matches!(self, LeadStatus::Won | LeadStatus::Lost)
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::New
    }
}

string_enum! {
    /// Where a lead came from
    pub enum LeadSource {
        Website => "website",
        ContactForm => "contact_form",
        Referral => "referral",
        Calculator => "calculator",
        Phone => "phone",
        Other => "other",
    }
}

impl Default for LeadSource {
    fn default() -> Self {
        Self::Website
    }
}

string_enum! {
    pub enum InteractionKind {
        Call => "call",
        Email => "email",
        Meeting => "meeting",
        Message => "message",
        /// Recorded automatically when the lead moves between columns
        StatusChange => "status_change",
    }
}

/// Entry in a lead's activity timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadInteraction {
    pub id: i64,
    pub lead_id: i64,
    pub kind: InteractionKind,
    pub summary: String,
    pub author_id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadNote {
    pub id: i64,
    pub lead_id: i64,
    pub content: String,
    pub author_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLeadInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_interest: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub source: LeadSource,
    pub estimated_value: Option<f64>,
    pub owner_id: Option<i64>,
    #[serde(skip)]
    pub contact_id: Option<i64>,
}

/// Partial update. Status changes go through the board transition instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLeadInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_interest: Option<String>,
    pub message: Option<String>,
    pub source: Option<LeadSource>,
    pub estimated_value: Option<f64>,
    pub owner_id: Option<i64>,
    pub lost_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInteractionInput {
    pub kind: InteractionKind,
    pub summary: String,
    /// Defaults to now
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Filters for the lead list
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub owner_id: Option<i64>,
    /// Matched against name, email and company
    pub search: Option<String>,
}

/// One Kanban column
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub status: LeadStatus,
    pub count: usize,
    pub leads: Vec<Lead>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_order_matches_pipeline() {
        assert_eq!(
            LeadStatus::values(),
            vec!["new", "contacted", "qualified", "proposal", "negotiation", "won", "lost"]
        );
    }

    #[test]
    fn test_closed_statuses() {
        assert!(LeadStatus::Won.is_closed());
        assert!(LeadStatus::Lost.is_closed());
        assert!(!LeadStatus::Negotiation.is_closed());
    }

    #[test]
    fn test_source_serializes_snake_case() {
        assert_eq!(LeadSource::ContactForm.to_string(), "contact_form");
        assert_eq!(LeadSource::from_str("contact_form").unwrap(), LeadSource::ContactForm);
        assert_eq!(
            serde_json::to_value(InteractionKind::StatusChange).unwrap(),
            "status_change"
        );
    }
}
