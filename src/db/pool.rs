//! Connection pools for the two supported drivers
//!
//! `create_pool` picks SQLite or MySQL from configuration and returns it as a
//! `DynDatabasePool`; repositories reach the concrete sqlx pool through
//! `as_sqlite` / `as_mysql` (see `with_pool!`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// Driver-independent handle on a connection pool
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    /// Wait for checked-out connections to be returned, then close them all
    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Shared pool handle
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// How a configured SQLite location should be opened
#[derive(Debug, Clone, PartialEq, Eq)]
struct SqliteTarget {
    url: String,
    /// Parent directory of a file database, created before connecting
    file: Option<String>,
}

impl SqliteTarget {
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite:<path>[?opts]` or a bare
    /// file path. File databases are opened read-write-create unless the URL
    /// already carries options.
    fn parse(location: &str) -> Self {
        if location == ":memory:" || location.starts_with("sqlite::memory:") {
            return Self {
                url: "sqlite::memory:".to_string(),
                file: None,
            };
        }

        let (path, url) = match location.strip_prefix("sqlite:") {
            Some(rest) if location.contains('?') => {
                (rest.split('?').next().unwrap_or(rest), location.to_string())
            }
            Some(rest) => (rest, format!("{}?mode=rwc", location)),
            None => (location, format!("sqlite:{}?mode=rwc", location)),
        };

        Self {
            url,
            file: Some(path.trim_start_matches("//").to_string()),
        }
    }

    fn in_memory(&self) -> bool {
        self.file.is_none()
    }
}

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(location: &str, max_connections: Option<u32>) -> Result<Self> {
        let target = SqliteTarget::parse(location);

        if let Some(file) = &target.file {
            if let Some(parent) = Path::new(file).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        // An in-memory database disappears with its last connection, so the
        // pool holds exactly one and never recycles it.
        let options = if target.in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.unwrap_or(SQLITE_MAX_CONNECTIONS))
        };

        let pool = options
            .connect(&target.url)
            .await
            .with_context(|| format!("Failed to open SQLite database {}", location))?;

        // Lead notes and interactions cascade with their lead
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn new(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections.unwrap_or(MYSQL_MAX_CONNECTIONS))
            .connect(&url)
            .await
            .context("Failed to connect to MySQL")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Open the configured database
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let pool: DynDatabasePool = match config.driver {
        DatabaseDriver::Sqlite => {
            Arc::new(SqliteDatabase::new(&config.url, config.max_connections).await?)
        }
        DatabaseDriver::Mysql => {
            Arc::new(MysqlDatabase::new(&config.url, config.max_connections).await?)
        }
    };
    Ok(pool)
}

/// Fresh in-memory SQLite database, used throughout the test suites
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        max_connections: None,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config(url: String) -> DatabaseConfig {
        DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url,
            max_connections: Some(2),
        }
    }

    #[test]
    fn test_sqlite_target_parsing() {
        assert!(SqliteTarget::parse(":memory:").in_memory());
        assert!(SqliteTarget::parse("sqlite::memory:").in_memory());

        let bare = SqliteTarget::parse("data/site.db");
        assert_eq!(bare.url, "sqlite:data/site.db?mode=rwc");
        assert_eq!(bare.file.as_deref(), Some("data/site.db"));

        let prefixed = SqliteTarget::parse("sqlite:data/site.db");
        assert_eq!(prefixed.url, "sqlite:data/site.db?mode=rwc");

        let with_options = SqliteTarget::parse("sqlite://var/site.db?mode=ro");
        assert_eq!(with_options.url, "sqlite://var/site.db?mode=ro");
        assert_eq!(with_options.file.as_deref(), Some("var/site.db"));
    }

    #[tokio::test]
    async fn test_test_pool_is_sqlite() {
        let pool = create_test_pool().await.unwrap();
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_schema_survives_between_statements() {
        let pool = create_test_pool().await.unwrap();
        pool.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        for _ in 0..3 {
            assert_eq!(pool.execute("INSERT INTO scratch DEFAULT VALUES").await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("site.db");

        let pool = create_pool(&sqlite_config(path.to_string_lossy().to_string()))
            .await
            .unwrap();
        pool.ping().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_queries() {
        let pool = create_test_pool().await.unwrap();
        pool.close().await;
        assert!(pool.ping().await.is_err());
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/lexsite_test".to_string());
        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
            max_connections: Some(2),
        })
        .await
        .unwrap();
        assert!(pool.as_mysql().is_some());
        pool.ping().await.unwrap();
    }
}
