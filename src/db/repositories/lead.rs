//! Lead repository
//!
//! Leads plus their interaction timeline and notes. Status transitions and
//! contact conversion run in a transaction so the lead row and its side
//! records change together.

use crate::db::{like_pattern, with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::{
    ContactStatus, InteractionKind, Lead, LeadFilter, LeadInteraction, LeadNote, LeadStatus,
    ListParams,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const LEAD_COLUMNS: &str = "id, name, email, phone, company, service_interest, message, source, status, \
     estimated_value, owner_id, contact_id, lost_reason, created_at, updated_at, closed_at";

const LEAD_FILTER: &str = "(? IS NULL OR status = ?) AND (? IS NULL OR owner_id = ?) \
     AND (? IS NULL OR name LIKE ? OR email LIKE ? OR company LIKE ?)";

/// A status change to apply atomically with its timeline entry
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub lead_id: i64,
    pub to: LeadStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub lost_reason: Option<String>,
    pub summary: String,
    pub author_id: Option<i64>,
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Insert a lead. `id` and timestamps of the argument are ignored.
    async fn create(&self, lead: &Lead) -> Result<Lead>;

    /// Insert a lead converted from a contact submission and link the
    /// contact back to it, marking a pending contact as read. Returns `None`
    /// and writes nothing when the contact is missing or already linked.
    async fn create_from_contact(&self, lead: &Lead, contact_id: i64) -> Result<Option<Lead>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Lead>>;

    /// Persist every field except status, closed_at and created_at
    async fn update(&self, lead: &Lead) -> Result<Lead>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Filtered list, newest first
    async fn list(&self, filter: &LeadFilter, params: &ListParams) -> Result<(Vec<Lead>, i64)>;

    /// Every lead, most recently updated first
    async fn list_all(&self) -> Result<Vec<Lead>>;

    /// Lead count per status
    async fn count_by_status(&self) -> Result<Vec<(LeadStatus, i64)>>;

    /// Apply a status change and record it in the timeline
    async fn apply_transition(&self, transition: &StatusTransition) -> Result<Lead>;

    async fn add_interaction(&self, interaction: &LeadInteraction) -> Result<LeadInteraction>;

    /// Interactions for a lead, newest first
    async fn list_interactions(&self, lead_id: i64) -> Result<Vec<LeadInteraction>>;

    async fn add_note(&self, note: &LeadNote) -> Result<LeadNote>;

    /// Notes for a lead, newest first
    async fn list_notes(&self, lead_id: i64) -> Result<Vec<LeadNote>>;

    async fn get_note(&self, id: i64) -> Result<Option<LeadNote>>;

    async fn delete_note(&self, id: i64) -> Result<()>;
}

pub struct SqlxLeadRepository {
    pool: DynDatabasePool,
}

impl SqlxLeadRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LeadRepository> {
        Arc::new(Self::new(pool))
    }

    async fn require(&self, id: i64) -> Result<Lead> {
        self.get_by_id(id)
            .await?
            .with_context(|| format!("Lead {} vanished after write", id))
    }
}

const INSERT_LEAD: &str = r#"
    INSERT INTO leads (name, email, phone, company, service_interest, message, source, status,
                       estimated_value, owner_id, contact_id, lost_reason, created_at, updated_at, closed_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[async_trait]
impl LeadRepository for SqlxLeadRepository {
    async fn create(&self, lead: &Lead) -> Result<Lead> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query(INSERT_LEAD)
                .bind(&lead.name)
                .bind(&lead.email)
                .bind(&lead.phone)
                .bind(&lead.company)
                .bind(&lead.service_interest)
                .bind(&lead.message)
                .bind(lead.source.as_str())
                .bind(lead.status.as_str())
                .bind(lead.estimated_value)
                .bind(lead.owner_id)
                .bind(lead.contact_id)
                .bind(&lead.lost_reason)
                .bind(now)
                .bind(now)
                .bind(lead.closed_at)
                .execute(pool)
                .await
                .context("Failed to create lead")?
                .insert_id()
        });
        self.require(id).await
    }

    async fn create_from_contact(&self, lead: &Lead, contact_id: i64) -> Result<Option<Lead>> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(INSERT_LEAD)
                .bind(&lead.name)
                .bind(&lead.email)
                .bind(&lead.phone)
                .bind(&lead.company)
                .bind(&lead.service_interest)
                .bind(&lead.message)
                .bind(lead.source.as_str())
                .bind(lead.status.as_str())
                .bind(lead.estimated_value)
                .bind(lead.owner_id)
                .bind(contact_id)
                .bind(&lead.lost_reason)
                .bind(now)
                .bind(now)
                .bind(lead.closed_at)
                .execute(&mut *tx)
                .await
                .context("Failed to create lead from contact")?
                .insert_id();

            let linked = sqlx::query(
                r#"
                UPDATE contacts
                SET lead_id = ?,
                    status = CASE WHEN status = ? THEN ? ELSE status END,
                    updated_at = ?
                WHERE id = ? AND lead_id IS NULL
                "#,
            )
            .bind(id)
            .bind(ContactStatus::Pending.as_str())
            .bind(ContactStatus::Read.as_str())
            .bind(now)
            .bind(contact_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link contact to lead")?
            .rows_affected();

            if linked == 0 {
                tx.rollback().await.context("Failed to roll back contact conversion")?;
                None
            } else {
                tx.commit().await.context("Failed to commit contact conversion")?;
                Some(id)
            }
        });
        match id {
            Some(id) => self.require(id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Lead>> {
        let sql = format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get lead")?;
            row.as_ref().map(lead_from_row).transpose()
        })
    }

    async fn update(&self, lead: &Lead) -> Result<Lead> {
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE leads
                SET name = ?, email = ?, phone = ?, company = ?, service_interest = ?, message = ?,
                    source = ?, estimated_value = ?, owner_id = ?, lost_reason = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&lead.name)
            .bind(&lead.email)
            .bind(&lead.phone)
            .bind(&lead.company)
            .bind(&lead.service_interest)
            .bind(&lead.message)
            .bind(lead.source.as_str())
            .bind(lead.estimated_value)
            .bind(lead.owner_id)
            .bind(&lead.lost_reason)
            .bind(Utc::now())
            .bind(lead.id)
            .execute(pool)
            .await
            .context("Failed to update lead")?;
        });
        self.require(lead.id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            sqlx::query("UPDATE contacts SET lead_id = NULL WHERE lead_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to unlink contacts")?;
            sqlx::query("DELETE FROM leads WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete lead")?;
            tx.commit().await.context("Failed to commit lead deletion")?;
        });
        Ok(())
    }

    async fn list(&self, filter: &LeadFilter, params: &ListParams) -> Result<(Vec<Lead>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let count_sql = format!("SELECT COUNT(*) AS count FROM leads WHERE {}", LEAD_FILTER);
        let list_sql = format!(
            "SELECT {} FROM leads WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            LEAD_COLUMNS, LEAD_FILTER
        );

        with_pool!(self.pool, pool => {
            let total = sqlx::query(&count_sql)
                .bind(status)
                .bind(status)
                .bind(filter.owner_id)
                .bind(filter.owner_id)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .fetch_one(pool)
                .await
                .context("Failed to count leads")?
                .i64("count")?;

            let rows = sqlx::query(&list_sql)
                .bind(status)
                .bind(status)
                .bind(filter.owner_id)
                .bind(filter.owner_id)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
                .context("Failed to list leads")?;

            let leads = rows.iter().map(lead_from_row).collect::<Result<Vec<_>>>()?;
            Ok((leads, total))
        })
    }

    async fn list_all(&self) -> Result<Vec<Lead>> {
        let sql = format!(
            "SELECT {} FROM leads ORDER BY updated_at DESC, id DESC",
            LEAD_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list leads")?;
            rows.iter().map(lead_from_row).collect()
        })
    }

    async fn count_by_status(&self) -> Result<Vec<(LeadStatus, i64)>> {
        with_pool!(self.pool, pool => {
            let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM leads GROUP BY status")
                .fetch_all(pool)
                .await
                .context("Failed to count leads by status")?;
            rows.iter().map(status_count_from_row).collect()
        })
    }

    async fn apply_transition(&self, transition: &StatusTransition) -> Result<Lead> {
        let now = Utc::now();
        with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            sqlx::query(
                "UPDATE leads SET status = ?, closed_at = ?, lost_reason = ?, updated_at = ? WHERE id = ?",
            )
            .bind(transition.to.as_str())
            .bind(transition.closed_at)
            .bind(&transition.lost_reason)
            .bind(now)
            .bind(transition.lead_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update lead status")?;

            sqlx::query(
                r#"
                INSERT INTO lead_interactions (lead_id, kind, summary, author_id, occurred_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(transition.lead_id)
            .bind(InteractionKind::StatusChange.as_str())
            .bind(&transition.summary)
            .bind(transition.author_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to record status change")?;

            tx.commit().await.context("Failed to commit status change")?;
        });
        self.require(transition.lead_id).await
    }

    async fn add_interaction(&self, interaction: &LeadInteraction) -> Result<LeadInteraction> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO lead_interactions (lead_id, kind, summary, author_id, occurred_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(interaction.lead_id)
            .bind(interaction.kind.as_str())
            .bind(&interaction.summary)
            .bind(interaction.author_id)
            .bind(interaction.occurred_at)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to add interaction")?
            .insert_id()
        });
        Ok(LeadInteraction {
            id,
            created_at: now,
            ..interaction.clone()
        })
    }

    async fn list_interactions(&self, lead_id: i64) -> Result<Vec<LeadInteraction>> {
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(
                r#"
                SELECT id, lead_id, kind, summary, author_id, occurred_at, created_at
                FROM lead_interactions
                WHERE lead_id = ?
                ORDER BY occurred_at DESC, id DESC
                "#,
            )
            .bind(lead_id)
            .fetch_all(pool)
            .await
            .context("Failed to list interactions")?;
            rows.iter().map(interaction_from_row).collect()
        })
    }

    async fn add_note(&self, note: &LeadNote) -> Result<LeadNote> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query("INSERT INTO lead_notes (lead_id, content, author_id, created_at) VALUES (?, ?, ?, ?)")
                .bind(note.lead_id)
                .bind(&note.content)
                .bind(note.author_id)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to add note")?
                .insert_id()
        });
        Ok(LeadNote {
            id,
            created_at: now,
            ..note.clone()
        })
    }

    async fn list_notes(&self, lead_id: i64) -> Result<Vec<LeadNote>> {
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(
                "SELECT id, lead_id, content, author_id, created_at FROM lead_notes WHERE lead_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(lead_id)
            .fetch_all(pool)
            .await
            .context("Failed to list notes")?;
            rows.iter().map(note_from_row).collect()
        })
    }

    async fn get_note(&self, id: i64) -> Result<Option<LeadNote>> {
        with_pool!(self.pool, pool => {
            let row = sqlx::query("SELECT id, lead_id, content, author_id, created_at FROM lead_notes WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get note")?;
            row.as_ref().map(note_from_row).transpose()
        })
    }

    async fn delete_note(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM lead_notes WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete note")?;
        });
        Ok(())
    }
}

fn lead_from_row<R: DbRow>(row: &R) -> Result<Lead> {
    Ok(Lead {
        id: row.i64("id")?,
        name: row.string("name")?,
        email: row.string("email")?,
        phone: row.opt_string("phone")?,
        company: row.opt_string("company")?,
        service_interest: row.opt_string("service_interest")?,
        message: row.opt_string("message")?,
        source: row.string("source")?.parse()?,
        status: row.string("status")?.parse()?,
        estimated_value: row.opt_f64("estimated_value")?,
        owner_id: row.opt_i64("owner_id")?,
        contact_id: row.opt_i64("contact_id")?,
        lost_reason: row.opt_string("lost_reason")?,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
        closed_at: row.opt_datetime("closed_at")?,
    })
}

fn status_count_from_row<R: DbRow>(row: &R) -> Result<(LeadStatus, i64)> {
    Ok((row.string("status")?.parse()?, row.i64("count")?))
}

fn interaction_from_row<R: DbRow>(row: &R) -> Result<LeadInteraction> {
    Ok(LeadInteraction {
        id: row.i64("id")?,
        lead_id: row.i64("lead_id")?,
        kind: row.string("kind")?.parse()?,
        summary: row.string("summary")?,
        author_id: row.opt_i64("author_id")?,
        occurred_at: row.datetime("occurred_at")?,
        created_at: row.datetime("created_at")?,
    })
}

fn note_from_row<R: DbRow>(row: &R) -> Result<LeadNote> {
    Ok(LeadNote {
        id: row.i64("id")?,
        lead_id: row.i64("lead_id")?,
        content: row.string("content")?,
        author_id: row.opt_i64("author_id")?,
        created_at: row.datetime("created_at")?,
    })
}
