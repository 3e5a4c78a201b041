//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login session. The id doubles as the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` with a fresh random token
    pub fn start(user_id: i64, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + lifetime,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_generates_unique_tokens() {
        let a = Session::start(1, Duration::days(7));
        let b = Session::start(1, Duration::days(7));
        assert_ne!(a.id, b.id);
        assert!(!a.is_expired());
    }

    #[test]
    fn test_expired_session() {
        let session = Session::start(1, Duration::seconds(-1));
        assert!(session.is_expired());
    }
}
