//! Session repository
//!
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::db::{with_pool, DbRow, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        with_pool!(self.pool, pool => {
            sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(pool)
                .await
                .context("Failed to create session")?;
        });
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        with_pool!(self.pool, pool => {
            let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get session")?;
            row.as_ref().map(session_from_row).transpose()
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete session")?;
        });
        Ok(())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(user_id)
                .execute(pool)
                .await
                .context("Failed to delete user sessions")?;
        });
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        with_pool!(self.pool, pool => {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(Utc::now())
                .execute(pool)
                .await
                .context("Failed to delete expired sessions")?;
            Ok(result.rows_affected())
        })
    }
}

fn session_from_row<R: DbRow>(row: &R) -> Result<Session> {
    Ok(Session {
        id: row.string("id")?,
        user_id: row.i64("user_id")?,
        expires_at: row.datetime("expires_at")?,
        created_at: row.datetime("created_at")?,
    })
}
