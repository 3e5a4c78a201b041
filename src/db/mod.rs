//! Database layer
//!
//! SQLite is the default (single-binary deployment); MySQL is available for
//! larger installations. The driver is selected from configuration and hidden
//! behind the `DatabasePool` trait.
//!
//! # Usage
//!
//! ```ignore
//! use lexsite::config::DatabaseConfig;
//! use lexsite::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```
//!
//! Repositories write each query once and run it against whichever concrete
//! pool is configured via [`with_pool!`]. Row decoding goes through [`DbRow`]
//! so mapping functions are shared by both drivers.

pub mod migrations;
pub mod pool;
pub mod repositories;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlQueryResult, MySqlRow};
use sqlx::sqlite::{SqliteQueryResult, SqliteRow};
use sqlx::Row;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Run `$body` with `$conn` bound to the concrete sqlx pool of `$pool`.
///
/// The body is expanded once per driver, so it must only use APIs that exist
/// on both `SqlitePool` and `MySqlPool`.
macro_rules! with_pool {
    ($pool:expr, $conn:ident => $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $conn = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool unavailable"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $conn = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool unavailable"))?;
                $body
            }
        }
    };
}
pub(crate) use with_pool;

/// Typed column access shared by SQLite and MySQL rows
pub trait DbRow {
    fn i64(&self, col: &str) -> Result<i64>;
    fn opt_i64(&self, col: &str) -> Result<Option<i64>>;
    fn f64(&self, col: &str) -> Result<f64>;
    fn opt_f64(&self, col: &str) -> Result<Option<f64>>;
    fn string(&self, col: &str) -> Result<String>;
    fn opt_string(&self, col: &str) -> Result<Option<String>>;
    fn boolean(&self, col: &str) -> Result<bool>;
    fn datetime(&self, col: &str) -> Result<DateTime<Utc>>;
    fn opt_datetime(&self, col: &str) -> Result<Option<DateTime<Utc>>>;
}

macro_rules! impl_db_row {
    ($row:ty) => {
        impl DbRow for $row {
            fn i64(&self, col: &str) -> Result<i64> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn opt_i64(&self, col: &str) -> Result<Option<i64>> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn f64(&self, col: &str) -> Result<f64> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn opt_f64(&self, col: &str) -> Result<Option<f64>> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn string(&self, col: &str) -> Result<String> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn opt_string(&self, col: &str) -> Result<Option<String>> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn boolean(&self, col: &str) -> Result<bool> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn datetime(&self, col: &str) -> Result<DateTime<Utc>> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
            fn opt_datetime(&self, col: &str) -> Result<Option<DateTime<Utc>>> {
                self.try_get(col).with_context(|| format!("column {}", col))
            }
        }
    };
}

impl_db_row!(SqliteRow);
impl_db_row!(MySqlRow);

/// Id of the row created by an INSERT
pub trait InsertId {
    fn insert_id(&self) -> i64;
}

impl InsertId for SqliteQueryResult {
    fn insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertId for MySqlQueryResult {
    fn insert_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}

/// Wrap a search term for a `LIKE` comparison
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}
