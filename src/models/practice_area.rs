//! Practice areas, shown on the public site as "services"

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeArea {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Short text for cards and meta descriptions
    pub summary: String,
    /// Markdown source
    pub description: String,
    pub description_html: String,
    pub icon: Option<String>,
    pub is_active: bool,
    /// Display position, dense from 0
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePracticeAreaInput {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePracticeAreaInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}
