//! Sliding-window rate limiting
//!
//! Protects the login endpoint against brute force and the public forms
//! (contact, newsletter) against flooding:
//! - failed logins: 5 per username per 15 minutes
//! - login requests: 10 per client IP per minute
//! - form submissions: 5 per client IP per 10 minutes

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Timestamps of recent events per key, counted over a fixed window
pub struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash + Clone> SlidingWindow<K> {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            events: RwLock::new(HashMap::new()),
        }
    }

    /// True when `key` already has `limit` events inside the window
    pub async fn is_limited(&self, key: &K) -> bool {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        match events.get_mut(key) {
            Some(times) => {
                times.retain(|time| *time > cutoff);
                times.len() >= self.limit
            }
            None => false,
        }
    }

    pub async fn record(&self, key: &K) {
        let mut events = self.events.write().await;
        events.entry(key.clone()).or_default().push(Utc::now());
    }

    /// Check and record in one step. Returns false when the event is rejected.
    pub async fn try_acquire(&self, key: &K) -> bool {
        let now = Utc::now();
        let cutoff = now - self.window;
        let mut events = self.events.write().await;
        let times = events.entry(key.clone()).or_default();
        times.retain(|time| *time > cutoff);
        if times.len() >= self.limit {
            return false;
        }
        times.push(now);
        true
    }

    pub async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    /// Drop expired timestamps and empty keys
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }
}

/// All limiters used by the HTTP layer
pub struct RateLimiter {
    login_failures: SlidingWindow<String>,
    login_requests: SlidingWindow<IpAddr>,
    form_submissions: SlidingWindow<IpAddr>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            login_failures: SlidingWindow::new(5, Duration::minutes(15)),
            login_requests: SlidingWindow::new(10, Duration::minutes(1)),
            form_submissions: SlidingWindow::new(5, Duration::minutes(10)),
        }
    }

    /// Usernames are compared case-insensitively
    pub async fn is_username_limited(&self, username: &str) -> bool {
        self.login_failures.is_limited(&username.to_lowercase()).await
    }

    pub async fn record_failed_login(&self, username: &str) {
        self.login_failures.record(&username.to_lowercase()).await;
    }

    /// Called after a successful login
    pub async fn clear_username(&self, username: &str) {
        self.login_failures.clear(&username.to_lowercase()).await;
    }

    /// Count a login request from `ip`; false when over the limit
    pub async fn allow_login_request(&self, ip: IpAddr) -> bool {
        self.login_requests.try_acquire(&ip).await
    }

    /// Count a public form submission from `ip`; false when over the limit
    pub async fn allow_form_submission(&self, ip: IpAddr) -> bool {
        self.form_submissions.try_acquire(&ip).await
    }

    /// Clean up old entries (called periodically from main)
    pub async fn cleanup(&self) {
        self.login_failures.cleanup().await;
        self.login_requests.cleanup().await;
        self.form_submissions.cleanup().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
