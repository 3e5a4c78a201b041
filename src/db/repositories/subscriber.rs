//! Newsletter subscriber repository

use crate::db::{with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::{ListParams, Subscriber, SubscriberStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

const SUBSCRIBER_COLUMNS: &str =
    "id, email, name, status, token, source, subscribed_at, unsubscribed_at";

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn create(&self, subscriber: &Subscriber) -> Result<Subscriber>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Subscriber>>;

    /// Lookup by (already lower-cased) email
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    async fn get_by_token(&self, token: &str) -> Result<Option<Subscriber>>;

    /// Persist name, status, token, source and both timestamps
    async fn update(&self, subscriber: &Subscriber) -> Result<Subscriber>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Newest first, optionally restricted to one status
    async fn list(
        &self,
        status: Option<SubscriberStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Subscriber>, i64)>;

    /// Every active subscriber, oldest first
    async fn list_active(&self) -> Result<Vec<Subscriber>>;

    async fn count_by_status(&self, status: SubscriberStatus) -> Result<i64>;
}

pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Subscriber>> {
        let sql = format!("SELECT {} FROM subscribers WHERE {} = ?", SUBSCRIBER_COLUMNS, column);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(value)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("Failed to get subscriber by {}", column))?;
            row.as_ref().map(subscriber_from_row).transpose()
        })
    }
}

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create(&self, subscriber: &Subscriber) -> Result<Subscriber> {
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO subscribers (email, name, status, token, source, subscribed_at, unsubscribed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&subscriber.email)
            .bind(&subscriber.name)
            .bind(subscriber.status.as_str())
            .bind(&subscriber.token)
            .bind(&subscriber.source)
            .bind(subscriber.subscribed_at)
            .bind(subscriber.unsubscribed_at)
            .execute(pool)
            .await
            .context("Failed to create subscriber")?
            .insert_id()
        });
        Ok(Subscriber {
            id,
            ..subscriber.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Subscriber>> {
        let sql = format!("SELECT {} FROM subscribers WHERE id = ?", SUBSCRIBER_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get subscriber")?;
            row.as_ref().map(subscriber_from_row).transpose()
        })
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        self.find_one("email", email).await
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Subscriber>> {
        self.find_one("token", token).await
    }

    async fn update(&self, subscriber: &Subscriber) -> Result<Subscriber> {
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE subscribers
                SET name = ?, status = ?, token = ?, source = ?, subscribed_at = ?, unsubscribed_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&subscriber.name)
            .bind(subscriber.status.as_str())
            .bind(&subscriber.token)
            .bind(&subscriber.source)
            .bind(subscriber.subscribed_at)
            .bind(subscriber.unsubscribed_at)
            .bind(subscriber.id)
            .execute(pool)
            .await
            .context("Failed to update subscriber")?;
        });
        Ok(subscriber.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM subscribers WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete subscriber")?;
        });
        Ok(())
    }

    async fn list(
        &self,
        status: Option<SubscriberStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Subscriber>, i64)> {
        let status = status.map(|s| s.as_str());
        let sql = format!(
            "SELECT {} FROM subscribers WHERE (? IS NULL OR status = ?) \
             ORDER BY subscribed_at DESC, id DESC LIMIT ? OFFSET ?",
            SUBSCRIBER_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let total = sqlx::query("SELECT COUNT(*) AS count FROM subscribers WHERE (? IS NULL OR status = ?)")
                .bind(status)
                .bind(status)
                .fetch_one(pool)
                .await
                .context("Failed to count subscribers")?
                .i64("count")?;
            let rows = sqlx::query(&sql)
                .bind(status)
                .bind(status)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
                .context("Failed to list subscribers")?;
            let subscribers = rows.iter().map(subscriber_from_row).collect::<Result<Vec<_>>>()?;
            Ok((subscribers, total))
        })
    }

    async fn list_active(&self) -> Result<Vec<Subscriber>> {
        let sql = format!(
            "SELECT {} FROM subscribers WHERE status = ? ORDER BY subscribed_at ASC, id ASC",
            SUBSCRIBER_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .bind(SubscriberStatus::Active.as_str())
                .fetch_all(pool)
                .await
                .context("Failed to list active subscribers")?;
            rows.iter().map(subscriber_from_row).collect()
        })
    }

    async fn count_by_status(&self, status: SubscriberStatus) -> Result<i64> {
        with_pool!(self.pool, pool => {
            sqlx::query("SELECT COUNT(*) AS count FROM subscribers WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(pool)
                .await
                .context("Failed to count subscribers")?
                .i64("count")
        })
    }
}

fn subscriber_from_row<R: DbRow>(row: &R) -> Result<Subscriber> {
    Ok(Subscriber {
        id: row.i64("id")?,
        email: row.string("email")?,
        name: row.opt_string("name")?,
        status: row.string("status")?.parse()?,
        token: row.string("token")?,
        source: row.opt_string("source")?,
        subscribed_at: row.datetime("subscribed_at")?,
        unsubscribed_at: row.opt_datetime("unsubscribed_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup_test_repo() -> SqlxSubscriberRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        SqlxSubscriberRepository::new(pool)
    }

    fn subscriber(email: &str) -> Subscriber {
        Subscriber {
            id: 0,
            email: email.to_string(),
            name: None,
            status: SubscriberStatus::Active,
            token: uuid::Uuid::new_v4().to_string(),
            source: Some("footer".to_string()),
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_by_email_and_token() {
        let repo = setup_test_repo().await;
        let created = repo.create(&subscriber("reader@example.com")).await.unwrap();

        let by_email = repo.get_by_email("reader@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        let by_token = repo.get_by_token(&created.token).await.unwrap().unwrap();
        assert_eq!(by_token.id, created.id);
        assert!(repo.get_by_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_and_counts() {
        let repo = setup_test_repo().await;
        let mut a = repo.create(&subscriber("a@example.com")).await.unwrap();
        repo.create(&subscriber("b@example.com")).await.unwrap();

        a.status = SubscriberStatus::Unsubscribed;
        a.unsubscribed_at = Some(Utc::now());
        repo.update(&a).await.unwrap();

        assert_eq!(repo.count_by_status(SubscriberStatus::Active).await.unwrap(), 1);
        let active = repo.list_active().await.unwrap();
        assert_eq!(active[0].email, "b@example.com");

        let (items, total) = repo
            .list(Some(SubscriberStatus::Unsubscribed), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(items[0].unsubscribed_at.is_some());

        repo.delete(a.id).await.unwrap();
        assert!(repo.get_by_id(a.id).await.unwrap().is_none());
    }
}
