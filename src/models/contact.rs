//! Contact form submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    /// Practice area selected on the form
    pub service: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    /// Lead created from this submission, once converted
    pub lead_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    pub enum ContactStatus {
        Pending => "pending",
        Read => "read",
        Archived => "archived",
    }
}

/// Public contact form payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub service: Option<String>,
    pub message: String,
}
