//! Practice area repository

use super::ordering;
use crate::db::{with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::PracticeArea;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const TABLE: &str = "practice_areas";

const AREA_COLUMNS: &str = "id, slug, title, summary, description, description_html, icon, is_active, \
     sort_order, created_at, updated_at";

#[async_trait]
pub trait PracticeAreaRepository: Send + Sync {
    /// Insert at the end of the display order
    async fn create(&self, area: &PracticeArea) -> Result<PracticeArea>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PracticeArea>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PracticeArea>>;

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Persist every field except the display position
    async fn update(&self, area: &PracticeArea) -> Result<PracticeArea>;

    /// Delete and compact the display order
    async fn delete(&self, id: i64) -> Result<()>;

    /// All areas in display order
    async fn list(&self, active_only: bool) -> Result<Vec<PracticeArea>>;

    /// Rewrite display positions in one transaction. `false` when the
    /// stored ids no longer match `positions`; nothing is written then.
    async fn apply_order(&self, positions: &[(i64, i64)]) -> Result<bool>;

    async fn count_active(&self) -> Result<i64>;

    /// Ids of every area in display order
    async fn ids_in_order(&self) -> Result<Vec<i64>>;
}

pub struct SqlxPracticeAreaRepository {
    pool: DynDatabasePool,
}

impl SqlxPracticeAreaRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PracticeAreaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PracticeAreaRepository for SqlxPracticeAreaRepository {
    async fn create(&self, area: &PracticeArea) -> Result<PracticeArea> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO practice_areas (slug, title, summary, description, description_html, icon,
                                            is_active, created_at, updated_at, sort_order)
                SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, COUNT(*) FROM practice_areas
                "#,
            )
            .bind(&area.slug)
            .bind(&area.title)
            .bind(&area.summary)
            .bind(&area.description)
            .bind(&area.description_html)
            .bind(&area.icon)
            .bind(area.is_active)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create practice area")?
            .insert_id()
        });
        self.get_by_id(id)
            .await?
            .context("Practice area missing after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PracticeArea>> {
        let sql = format!("SELECT {} FROM practice_areas WHERE id = ?", AREA_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get practice area")?;
            row.as_ref().map(area_from_row).transpose()
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PracticeArea>> {
        let sql = format!("SELECT {} FROM practice_areas WHERE slug = ?", AREA_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(slug)
                .fetch_optional(pool)
                .await
                .context("Failed to get practice area by slug")?;
            row.as_ref().map(area_from_row).transpose()
        })
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        with_pool!(self.pool, pool => {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM practice_areas WHERE slug = ? AND (? IS NULL OR id <> ?)",
            )
            .bind(slug)
            .bind(exclude_id)
            .bind(exclude_id)
            .fetch_one(pool)
            .await
            .context("Failed to check slug")?
            .i64("count")?;
            Ok(count > 0)
        })
    }

    async fn update(&self, area: &PracticeArea) -> Result<PracticeArea> {
        let now = Utc::now();
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE practice_areas
                SET slug = ?, title = ?, summary = ?, description = ?, description_html = ?, icon = ?,
                    is_active = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&area.slug)
            .bind(&area.title)
            .bind(&area.summary)
            .bind(&area.description)
            .bind(&area.description_html)
            .bind(&area.icon)
            .bind(area.is_active)
            .bind(now)
            .bind(area.id)
            .execute(pool)
            .await
            .context("Failed to update practice area")?;
        });
        Ok(PracticeArea {
            updated_at: now,
            ..area.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        ordering::delete_compacting(&self.pool, TABLE, id).await
    }

    async fn list(&self, active_only: bool) -> Result<Vec<PracticeArea>> {
        let sql = format!(
            "SELECT {} FROM practice_areas WHERE (? = 0 OR is_active = ?) ORDER BY sort_order ASC, id ASC",
            AREA_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .bind(active_only as i64)
                .bind(true)
                .fetch_all(pool)
                .await
                .context("Failed to list practice areas")?;
            rows.iter().map(area_from_row).collect()
        })
    }

    async fn apply_order(&self, positions: &[(i64, i64)]) -> Result<bool> {
        ordering::apply_order(&self.pool, TABLE, positions).await
    }

    async fn count_active(&self) -> Result<i64> {
        with_pool!(self.pool, pool => {
            sqlx::query("SELECT COUNT(*) AS count FROM practice_areas WHERE is_active = ?")
                .bind(true)
                .fetch_one(pool)
                .await
                .context("Failed to count practice areas")?
                .i64("count")
        })
    }

    async fn ids_in_order(&self) -> Result<Vec<i64>> {
        ordering::ids_in_order(&self.pool, TABLE).await
    }
}

fn area_from_row<R: DbRow>(row: &R) -> Result<PracticeArea> {
    Ok(PracticeArea {
        id: row.i64("id")?,
        slug: row.string("slug")?,
        title: row.string("title")?,
        summary: row.string("summary")?,
        description: row.string("description")?,
        description_html: row.string("description_html")?,
        icon: row.opt_string("icon")?,
        is_active: row.boolean("is_active")?,
        sort_order: row.i64("sort_order")?,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxPracticeAreaRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        SqlxPracticeAreaRepository::new(pool)
    }

    fn area(slug: &str, active: bool) -> PracticeArea {
        let now = Utc::now();
        PracticeArea {
            id: 0,
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            summary: String::new(),
            description: String::new(),
            description_html: String::new(),
            icon: None,
            is_active: active,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn orders(areas: &[PracticeArea]) -> Vec<(String, i64)> {
        areas.iter().map(|a| (a.slug.clone(), a.sort_order)).collect()
    }

    #[tokio::test]
    async fn test_create_appends() {
        let repo = setup_test_repo().await;
        for slug in ["labor", "tax", "family"] {
            repo.create(&area(slug, true)).await.unwrap();
        }
        let all = repo.list(false).await.unwrap();
        assert_eq!(
            orders(&all),
            vec![
                ("labor".to_string(), 0),
                ("tax".to_string(), 1),
                ("family".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_compacts() {
        let repo = setup_test_repo().await;
        let mut ids = Vec::new();
        for slug in ["a", "b", "c", "d"] {
            ids.push(repo.create(&area(slug, true)).await.unwrap().id);
        }
        repo.delete(ids[1]).await.unwrap();

        let all = repo.list(false).await.unwrap();
        assert_eq!(
            orders(&all),
            vec![("a".to_string(), 0), ("c".to_string(), 1), ("d".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_active_filter_and_slug_lookup() {
        let repo = setup_test_repo().await;
        let hidden = repo.create(&area("hidden", false)).await.unwrap();
        repo.create(&area("shown", true)).await.unwrap();

        let active = repo.list(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].slug, "shown");
        assert_eq!(repo.count_active().await.unwrap(), 1);

        assert!(repo.get_by_slug("hidden").await.unwrap().is_some());
        assert!(repo.slug_exists("hidden", None).await.unwrap());
        assert!(!repo.slug_exists("hidden", Some(hidden.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_order() {
        let repo = setup_test_repo().await;
        let a = repo.create(&area("a", true)).await.unwrap();
        let b = repo.create(&area("b", true)).await.unwrap();
        assert!(repo.apply_order(&[(b.id, 0), (a.id, 1)]).await.unwrap());

        let all = repo.list(false).await.unwrap();
        assert_eq!(all[0].id, b.id);
        assert_eq!(repo.ids_in_order().await.unwrap(), vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_stale_order_is_not_applied() {
        let repo = setup_test_repo().await;
        let a = repo.create(&area("a", true)).await.unwrap();
        let b = repo.create(&area("b", true)).await.unwrap();
        let c = repo.create(&area("c", true)).await.unwrap();

        // Planned against [a, b, c], then b is deleted before the write
        let planned = [(c.id, 0), (b.id, 1), (a.id, 2)];
        repo.delete(b.id).await.unwrap();
        assert!(!repo.apply_order(&planned).await.unwrap());

        let positions: Vec<(i64, i64)> = repo
            .list(false)
            .await
            .unwrap()
            .iter()
            .map(|p| (p.id, p.sort_order))
            .collect();
        assert_eq!(positions, vec![(a.id, 0), (c.id, 1)]);
    }
}
