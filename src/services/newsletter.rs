//! Newsletter subscriptions
//!
//! Signups are idempotent by email. Each subscriber carries an opaque token
//! used by the unsubscribe link; reactivating a subscription issues a fresh
//! token so old links stop working.

use crate::db::repositories::SubscriberRepository;
use crate::models::{ListParams, PagedResult, Subscriber, SubscriberStatus};
use crate::services::error::{clean_optional, is_valid_email, ServiceError, ServiceResult};
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeInput {
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubscribeOutcome {
    pub subscriber: Subscriber,
    pub already_subscribed: bool,
}

pub struct NewsletterService {
    repo: Arc<dyn SubscriberRepository>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn SubscriberRepository>) -> Self {
        Self { repo }
    }

    pub async fn subscribe(&self, input: SubscribeInput) -> ServiceResult<SubscribeOutcome> {
        let email = input.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ServiceError::validation("Invalid email format"));
        }

        let existing = self
            .repo
            .get_by_email(&email)
            .await
            .context("Failed to look up subscriber")?;

        match existing {
            Some(subscriber) if subscriber.status == SubscriberStatus::Active => Ok(SubscribeOutcome {
                subscriber,
                already_subscribed: true,
            }),
            Some(mut subscriber) => {
                subscriber.status = SubscriberStatus::Active;
                subscriber.token = new_token();
                subscriber.subscribed_at = Utc::now();
                subscriber.unsubscribed_at = None;
                if let Some(name) = clean_optional(input.name) {
                    subscriber.name = Some(name);
                }
                if let Some(source) = clean_optional(input.source) {
                    subscriber.source = Some(source);
                }
                let reactivated = self
                    .repo
                    .update(&subscriber)
                    .await
                    .context("Failed to reactivate subscriber")?;
                tracing::info!("Subscriber {} reactivated", reactivated.id);
                Ok(SubscribeOutcome {
                    subscriber: reactivated,
                    already_subscribed: false,
                })
            }
            None => {
                let subscriber = Subscriber {
                    id: 0,
                    email,
                    name: clean_optional(input.name),
                    status: SubscriberStatus::Active,
                    token: new_token(),
                    source: clean_optional(input.source),
                    subscribed_at: Utc::now(),
                    unsubscribed_at: None,
                };
                let created = self
                    .repo
                    .create(&subscriber)
                    .await
                    .context("Failed to create subscriber")?;
                Ok(SubscribeOutcome {
                    subscriber: created,
                    already_subscribed: false,
                })
            }
        }
    }

    /// Unsubscribing twice is not an error
    pub async fn unsubscribe(&self, token: &str) -> ServiceResult<Subscriber> {
        let mut subscriber = self
            .repo
            .get_by_token(token.trim())
            .await
            .context("Failed to look up subscriber")?
            .ok_or_else(|| ServiceError::not_found("Subscription"))?;

        if subscriber.status == SubscriberStatus::Unsubscribed {
            return Ok(subscriber);
        }
        subscriber.status = SubscriberStatus::Unsubscribed;
        subscriber.unsubscribed_at = Some(Utc::now());
        let updated = self
            .repo
            .update(&subscriber)
            .await
            .context("Failed to unsubscribe")?;
        Ok(updated)
    }

    pub async fn list(&self, status: Option<&str>, params: &ListParams) -> ServiceResult<PagedResult<Subscriber>> {
        let status = status
            .map(|s| {
                SubscriberStatus::from_str(s).map_err(|_| {
                    ServiceError::validation(format!(
                        "Invalid status '{}'. Valid values: {}",
                        s,
                        SubscriberStatus::values().join(", ")
                    ))
                })
            })
            .transpose()?;
        let (subscribers, total) = self
            .repo
            .list(status, params)
            .await
            .context("Failed to list subscribers")?;
        Ok(PagedResult::new(subscribers, total, params))
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get subscriber")?
            .ok_or_else(|| ServiceError::not_found("Subscriber"))?;
        self.repo.delete(id).await.context("Failed to delete subscriber")?;
        Ok(())
    }

    /// Active subscribers as `email,name,subscribed_at` CSV
    pub async fn export_csv(&self) -> ServiceResult<String> {
        let subscribers = self
            .repo
            .list_active()
            .await
            .context("Failed to list subscribers")?;
        Ok(subscribers_csv(&subscribers))
    }

    pub async fn count_active(&self) -> ServiceResult<i64> {
        let count = self
            .repo
            .count_by_status(SubscriberStatus::Active)
            .await
            .context("Failed to count subscribers")?;
        Ok(count)
    }
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

pub fn subscribers_csv(subscribers: &[Subscriber]) -> String {
    let mut out = String::from("email,name,subscribed_at\n");
    for s in subscribers {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&s.email),
            csv_field(s.name.as_deref().unwrap_or("")),
            s.subscribed_at.to_rfc3339()
        ));
    }
    out
}

/// Quote a field when it holds a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
