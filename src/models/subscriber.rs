//! Newsletter subscribers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    /// Stored lower-cased
    pub email: String,
    pub name: Option<String>,
    pub status: SubscriberStatus,
    /// Unsubscribe token sent in every mailing
    #[serde(skip_serializing)]
    pub token: String,
    /// Page or campaign the signup came from
    pub source: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

string_enum! {
    pub enum SubscriberStatus {
        Active => "active",
        Unsubscribed => "unsubscribed",
    }
}
