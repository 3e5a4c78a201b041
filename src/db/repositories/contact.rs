//! Contact submission repository

use crate::db::{with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::{Contact, ContactStatus, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, service, message, status, lead_id, \
     ip_address, created_at, updated_at";

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, contact: &Contact) -> Result<Contact>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>>;

    async fn set_status(&self, id: i64, status: ContactStatus) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Newest first, optionally restricted to one status
    async fn list(
        &self,
        status: Option<ContactStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Contact>, i64)>;

    async fn count_by_status(&self, status: ContactStatus) -> Result<i64>;
}

pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, contact: &Contact) -> Result<Contact> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO contacts (name, email, phone, subject, service, message, status, lead_id,
                                      ip_address, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.subject)
            .bind(&contact.service)
            .bind(&contact.message)
            .bind(contact.status.as_str())
            .bind(contact.lead_id)
            .bind(&contact.ip_address)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create contact")?
            .insert_id()
        });

        Ok(Contact {
            id,
            created_at: now,
            updated_at: now,
            ..contact.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get contact")?;
            row.as_ref().map(contact_from_row).transpose()
        })
    }

    async fn set_status(&self, id: i64, status: ContactStatus) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE contacts SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update contact status")?;
        });
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM contacts WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete contact")?;
        });
        Ok(())
    }

    async fn list(
        &self,
        status: Option<ContactStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Contact>, i64)> {
        let status = status.map(|s| s.as_str());
        let sql = format!(
            "SELECT {} FROM contacts WHERE (? IS NULL OR status = ?) ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            CONTACT_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let total = sqlx::query("SELECT COUNT(*) AS count FROM contacts WHERE (? IS NULL OR status = ?)")
                .bind(status)
                .bind(status)
                .fetch_one(pool)
                .await
                .context("Failed to count contacts")?
                .i64("count")?;
            let rows = sqlx::query(&sql)
                .bind(status)
                .bind(status)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
                .context("Failed to list contacts")?;
            let contacts = rows.iter().map(contact_from_row).collect::<Result<Vec<_>>>()?;
            Ok((contacts, total))
        })
    }

    async fn count_by_status(&self, status: ContactStatus) -> Result<i64> {
        with_pool!(self.pool, pool => {
            sqlx::query("SELECT COUNT(*) AS count FROM contacts WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(pool)
                .await
                .context("Failed to count contacts")?
                .i64("count")
        })
    }
}

fn contact_from_row<R: DbRow>(row: &R) -> Result<Contact> {
    Ok(Contact {
        id: row.i64("id")?,
        name: row.string("name")?,
        email: row.string("email")?,
        phone: row.opt_string("phone")?,
        subject: row.opt_string("subject")?,
        service: row.opt_string("service")?,
        message: row.string("message")?,
        status: row.string("status")?.parse()?,
        lead_id: row.opt_i64("lead_id")?,
        ip_address: row.opt_string("ip_address")?,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
    })
}
