//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! driver, and tracked in the `_migrations` table.
//!
//! ```ignore
//! use lexsite::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::{with_pool, DbRow, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                display_name VARCHAR(100),
                role VARCHAR(20) NOT NULL DEFAULT 'editor',
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                display_name VARCHAR(100) NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'editor',
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_role ON users(role);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    // contacts.lead_id is maintained by the lead repository; a foreign key
    // would be circular with leads.contact_id.
    Migration {
        version: 3,
        name: "create_contacts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(150) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50),
                subject VARCHAR(255),
                service VARCHAR(100),
                message TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                lead_id INTEGER,
                ip_address VARCHAR(64),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts(status);
            CREATE INDEX IF NOT EXISTS idx_contacts_created_at ON contacts(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(150) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50) NULL,
                subject VARCHAR(255) NULL,
                service VARCHAR(100) NULL,
                message TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                lead_id BIGINT NULL,
                ip_address VARCHAR(64) NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_contacts_status ON contacts(status);
            CREATE INDEX idx_contacts_created_at ON contacts(created_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_leads",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS leads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(150) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50),
                company VARCHAR(150),
                service_interest VARCHAR(100),
                message TEXT,
                source VARCHAR(20) NOT NULL DEFAULT 'website',
                status VARCHAR(20) NOT NULL DEFAULT 'new',
                estimated_value REAL,
                owner_id INTEGER,
                contact_id INTEGER,
                lost_reason TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                closed_at TIMESTAMP,
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL,
                FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);
            CREATE INDEX IF NOT EXISTS idx_leads_owner_id ON leads(owner_id);
            CREATE INDEX IF NOT EXISTS idx_leads_updated_at ON leads(updated_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS leads (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(150) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50) NULL,
                company VARCHAR(150) NULL,
                service_interest VARCHAR(100) NULL,
                message TEXT NULL,
                source VARCHAR(20) NOT NULL DEFAULT 'website',
                status VARCHAR(20) NOT NULL DEFAULT 'new',
                estimated_value DOUBLE NULL,
                owner_id BIGINT NULL,
                contact_id BIGINT NULL,
                lost_reason TEXT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                closed_at TIMESTAMP NULL DEFAULT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL,
                FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_leads_status ON leads(status);
            CREATE INDEX idx_leads_updated_at ON leads(updated_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_lead_activity",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS lead_interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lead_id INTEGER NOT NULL,
                kind VARCHAR(20) NOT NULL,
                summary TEXT NOT NULL,
                author_id INTEGER,
                occurred_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_lead_interactions_lead_id ON lead_interactions(lead_id);
            CREATE TABLE IF NOT EXISTS lead_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lead_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                author_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_lead_notes_lead_id ON lead_notes(lead_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS lead_interactions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                lead_id BIGINT NOT NULL,
                kind VARCHAR(20) NOT NULL,
                summary TEXT NOT NULL,
                author_id BIGINT NULL,
                occurred_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS lead_notes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                lead_id BIGINT NOT NULL,
                content TEXT NOT NULL,
                author_id BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (lead_id) REFERENCES leads(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_blog_posts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(200) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT NOT NULL,
                content TEXT NOT NULL,
                content_html TEXT NOT NULL,
                cover_image VARCHAR(500),
                category VARCHAR(100),
                tags TEXT NOT NULL DEFAULT '[]',
                author_id INTEGER,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                seo_title VARCHAR(255),
                seo_description TEXT,
                reading_minutes INTEGER NOT NULL DEFAULT 1,
                view_count INTEGER NOT NULL DEFAULT 0,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blog_posts_status ON blog_posts(status);
            CREATE INDEX IF NOT EXISTS idx_blog_posts_category ON blog_posts(category);
            CREATE INDEX IF NOT EXISTS idx_blog_posts_published_at ON blog_posts(published_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(200) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                excerpt TEXT NOT NULL,
                content LONGTEXT NOT NULL,
                content_html LONGTEXT NOT NULL,
                cover_image VARCHAR(500) NULL,
                category VARCHAR(100) NULL,
                tags TEXT NOT NULL,
                author_id BIGINT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                seo_title VARCHAR(255) NULL,
                seo_description TEXT NULL,
                reading_minutes BIGINT NOT NULL DEFAULT 1,
                view_count BIGINT NOT NULL DEFAULT 0,
                published_at TIMESTAMP NULL DEFAULT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_blog_posts_status ON blog_posts(status);
            CREATE INDEX idx_blog_posts_category ON blog_posts(category);
            CREATE INDEX idx_blog_posts_published_at ON blog_posts(published_at);
        "#,
    },
    Migration {
        version: 7,
        name: "create_practice_areas",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS practice_areas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(200) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                summary TEXT NOT NULL,
                description TEXT NOT NULL,
                description_html TEXT NOT NULL,
                icon VARCHAR(100),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_practice_areas_sort_order ON practice_areas(sort_order);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS practice_areas (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(200) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                summary TEXT NOT NULL,
                description LONGTEXT NOT NULL,
                description_html LONGTEXT NOT NULL,
                icon VARCHAR(100) NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                sort_order BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_practice_areas_sort_order ON practice_areas(sort_order);
        "#,
    },
    Migration {
        version: 8,
        name: "create_testimonials",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS testimonials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_name VARCHAR(150) NOT NULL,
                author_role VARCHAR(150),
                company VARCHAR(150),
                content TEXT NOT NULL,
                rating INTEGER,
                avatar_url VARCHAR(500),
                is_published BOOLEAN NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_testimonials_sort_order ON testimonials(sort_order);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS testimonials (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                author_name VARCHAR(150) NOT NULL,
                author_role VARCHAR(150) NULL,
                company VARCHAR(150) NULL,
                content TEXT NOT NULL,
                rating BIGINT NULL,
                avatar_url VARCHAR(500) NULL,
                is_published BOOLEAN NOT NULL DEFAULT FALSE,
                sort_order BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_testimonials_sort_order ON testimonials(sort_order);
        "#,
    },
    Migration {
        version: 9,
        name: "create_subscribers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(150),
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                token VARCHAR(64) NOT NULL UNIQUE,
                source VARCHAR(50),
                subscribed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                unsubscribed_at TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_subscribers_status ON subscribers(status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(150) NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                token VARCHAR(64) NOT NULL UNIQUE,
                source VARCHAR(50) NULL,
                subscribed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                unsubscribed_at TIMESTAMP NULL DEFAULT NULL
            );
            CREATE INDEX idx_subscribers_status ON subscribers(status);
        "#,
    },
];

/// Run all pending migrations
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    with_pool!(pool, conn => {
        let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(conn)
            .await
            .context("Failed to read applied migrations")?;

        rows.iter().map(|row| migration_from_row(row)).collect()
    })
}

fn migration_from_row(row: &impl DbRow) -> Result<MigrationRecord> {
    Ok(MigrationRecord {
        version: row.i64("version")?,
        name: row.string("name")?,
        applied_at: row.datetime("applied_at")?,
    })
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    with_pool!(pool, conn => {
        for statement in split_sql_statements(sql) {
            sqlx::query(statement)
                .execute(conn)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }

        sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(conn)
            .await
            .context("Failed to record migration")?;
    });

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

fn is_comment_only(s: &str) -> bool {
    s.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with("--")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use sqlx::Row;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &DynDatabasePool, username: &str) -> i64 {
        let sqlite_pool = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind("hash123")
            .bind("admin")
            .execute(sqlite_pool)
            .await
            .expect("Failed to create user")
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, MIGRATIONS.len());

        // Second run is a no-op
        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, datetime('now', '+1 day'))",
        )
        .bind("session123")
        .bind(999i64)
        .execute(sqlite_pool)
        .await;
        assert!(result.is_err());

        let user_id = insert_user(&pool, "owner").await;
        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, datetime('now', '+1 day'))",
        )
        .bind("session123")
        .bind(user_id)
        .execute(sqlite_pool)
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unique_usernames() {
        let pool = migrated_pool().await;
        insert_user(&pool, "dup").await;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)",
        )
        .bind("dup")
        .bind("other@example.com")
        .bind("hash")
        .execute(pool.as_sqlite().unwrap())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_lead_delete_cascades_to_activity() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let lead_id = sqlx::query("INSERT INTO leads (name, email) VALUES (?, ?)")
            .bind("Ana")
            .bind("ana@example.com")
            .execute(sqlite_pool)
            .await
            .unwrap()
            .last_insert_rowid();

        sqlx::query("INSERT INTO lead_notes (lead_id, content) VALUES (?, ?)")
            .bind(lead_id)
            .bind("Called back")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO lead_interactions (lead_id, kind, summary, occurred_at) VALUES (?, 'call', 'Intro', CURRENT_TIMESTAMP)",
        )
        .bind(lead_id)
        .execute(sqlite_pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(lead_id)
            .execute(sqlite_pool)
            .await
            .unwrap();

        let notes: i64 = sqlx::query("SELECT COUNT(*) AS c FROM lead_notes")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("c");
        let interactions: i64 = sqlx::query("SELECT COUNT(*) AS c FROM lead_interactions")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("c");
        assert_eq!(notes, 0);
        assert_eq!(interactions, 0);
    }

    #[tokio::test]
    async fn test_owner_delete_sets_lead_owner_null() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();
        let user_id = insert_user(&pool, "owner").await;

        sqlx::query("INSERT INTO leads (name, email, owner_id) VALUES (?, ?, ?)")
            .bind("Ana")
            .bind("ana@example.com")
            .bind(user_id)
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(sqlite_pool)
            .await
            .unwrap();

        let owner: Option<i64> = sqlx::query("SELECT owner_id FROM leads")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("owner_id");
        assert!(owner.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_email_unique() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        for (i, expect_ok) in [(1, true), (2, false)] {
            let result = sqlx::query("INSERT INTO subscribers (email, token) VALUES (?, ?)")
                .bind("reader@example.com")
                .bind(format!("token-{}", i))
                .execute(sqlite_pool)
                .await;
            assert_eq!(result.is_ok(), expect_ok);
        }
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, idx + 1);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
