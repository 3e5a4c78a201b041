//! Client testimonials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i64,
    pub author_name: String,
    pub author_role: Option<String>,
    pub company: Option<String>,
    pub content: String,
    /// 1 to 5 stars
    pub rating: Option<i64>,
    pub avatar_url: Option<String>,
    pub is_published: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTestimonialInput {
    pub author_name: String,
    pub author_role: Option<String>,
    pub company: Option<String>,
    pub content: String,
    pub rating: Option<i64>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTestimonialInput {
    pub author_name: Option<String>,
    pub author_role: Option<String>,
    pub company: Option<String>,
    pub content: Option<String>,
    pub rating: Option<i64>,
    pub avatar_url: Option<String>,
    pub is_published: Option<bool>,
}
