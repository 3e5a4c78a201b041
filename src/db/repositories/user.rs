//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::{ListParams, User, UserRole, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, display_name, role, status, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist every mutable field of `user`
    async fn update(&self, user: &User) -> Result<User>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all users
    async fn count(&self) -> Result<i64>;

    /// Count users who are both admin and active
    async fn count_active_admins(&self) -> Result<i64>;

    /// List users ordered by creation
    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(value)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("Failed to get user by {}", column))?;
            row.as_ref().map(user_from_row).transpose()
        })
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO users (username, email, password_hash, display_name, role, status, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create user")?
            .insert_id()
        });

        Ok(User {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by ID")?;
            row.as_ref().map(user_from_row).transpose()
        })
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE users
                SET email = ?, password_hash = ?, display_name = ?, role = ?, status = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .bind(now)
            .bind(user.id)
            .execute(pool)
            .await
            .context("Failed to update user")?;
        });

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete user")?;
        });
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, pool => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
                .fetch_one(pool)
                .await
                .context("Failed to count users")?;
            row.i64("count")
        })
    }

    async fn count_active_admins(&self) -> Result<i64> {
        with_pool!(self.pool, pool => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE role = ? AND status = ?")
                .bind(UserRole::Admin.as_str())
                .bind(UserStatus::Active.as_str())
                .fetch_one(pool)
                .await
                .context("Failed to count admins")?;
            row.i64("count")
        })
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let total = self.count().await?;
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let users = with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
                .context("Failed to list users")?;
            rows.iter().map(user_from_row).collect::<Result<Vec<_>>>()?
        });
        Ok((users, total))
    }
}

fn user_from_row<R: DbRow>(row: &R) -> Result<User> {
    Ok(User {
        id: row.i64("id")?,
        username: row.string("username")?,
        email: row.string("email")?,
        password_hash: row.string("password_hash")?,
        display_name: row.opt_string("display_name")?,
        role: row.string("role")?.parse()?,
        status: row.string("status")?.parse()?,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
    })
}
