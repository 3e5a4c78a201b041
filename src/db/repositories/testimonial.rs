//! Testimonial repository

use super::ordering;
use crate::db::{with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::Testimonial;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const TABLE: &str = "testimonials";

const TESTIMONIAL_COLUMNS: &str = "id, author_name, author_role, company, content, rating, avatar_url, \
     is_published, sort_order, created_at, updated_at";

#[async_trait]
pub trait TestimonialRepository: Send + Sync {
    /// Insert at the end of the display order
    async fn create(&self, testimonial: &Testimonial) -> Result<Testimonial>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Testimonial>>;

    /// Persist every field except the display position
    async fn update(&self, testimonial: &Testimonial) -> Result<Testimonial>;

    /// Delete and compact the display order
    async fn delete(&self, id: i64) -> Result<()>;

    /// Testimonials in display order
    async fn list(&self, published_only: bool) -> Result<Vec<Testimonial>>;

    /// `false`, with nothing written, when the stored ids no longer match
    async fn apply_order(&self, positions: &[(i64, i64)]) -> Result<bool>;

    async fn ids_in_order(&self) -> Result<Vec<i64>>;

    async fn count_published(&self) -> Result<i64>;
}

pub struct SqlxTestimonialRepository {
    pool: DynDatabasePool,
}

impl SqlxTestimonialRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TestimonialRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TestimonialRepository for SqlxTestimonialRepository {
    async fn create(&self, testimonial: &Testimonial) -> Result<Testimonial> {
        let now = Utc::now();
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO testimonials (author_name, author_role, company, content, rating, avatar_url,
                                          is_published, created_at, updated_at, sort_order)
                SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, COUNT(*) FROM testimonials
                "#,
            )
            .bind(&testimonial.author_name)
            .bind(&testimonial.author_role)
            .bind(&testimonial.company)
            .bind(&testimonial.content)
            .bind(testimonial.rating)
            .bind(&testimonial.avatar_url)
            .bind(testimonial.is_published)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create testimonial")?
            .insert_id()
        });
        self.get_by_id(id)
            .await?
            .context("Testimonial missing after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Testimonial>> {
        let sql = format!("SELECT {} FROM testimonials WHERE id = ?", TESTIMONIAL_COLUMNS);
        with_pool!(self.pool, pool => {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get testimonial")?;
            row.as_ref().map(testimonial_from_row).transpose()
        })
    }

    async fn update(&self, testimonial: &Testimonial) -> Result<Testimonial> {
        let now = Utc::now();
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE testimonials
                SET author_name = ?, author_role = ?, company = ?, content = ?, rating = ?, avatar_url = ?,
                    is_published = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&testimonial.author_name)
            .bind(&testimonial.author_role)
            .bind(&testimonial.company)
            .bind(&testimonial.content)
            .bind(testimonial.rating)
            .bind(&testimonial.avatar_url)
            .bind(testimonial.is_published)
            .bind(now)
            .bind(testimonial.id)
            .execute(pool)
            .await
            .context("Failed to update testimonial")?;
        });
        Ok(Testimonial {
            updated_at: now,
            ..testimonial.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        ordering::delete_compacting(&self.pool, TABLE, id).await
    }

    async fn list(&self, published_only: bool) -> Result<Vec<Testimonial>> {
        let sql = format!(
            "SELECT {} FROM testimonials WHERE (? = 0 OR is_published = ?) ORDER BY sort_order ASC, id ASC",
            TESTIMONIAL_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .bind(published_only as i64)
                .bind(true)
                .fetch_all(pool)
                .await
                .context("Failed to list testimonials")?;
            rows.iter().map(testimonial_from_row).collect()
        })
    }

    async fn apply_order(&self, positions: &[(i64, i64)]) -> Result<bool> {
        ordering::apply_order(&self.pool, TABLE, positions).await
    }

    async fn ids_in_order(&self) -> Result<Vec<i64>> {
        ordering::ids_in_order(&self.pool, TABLE).await
    }

    async fn count_published(&self) -> Result<i64> {
        with_pool!(self.pool, pool => {
            sqlx::query("SELECT COUNT(*) AS count FROM testimonials WHERE is_published = ?")
                .bind(true)
                .fetch_one(pool)
                .await
                .context("Failed to count testimonials")?
                .i64("count")
        })
    }
}

fn testimonial_from_row<R: DbRow>(row: &R) -> Result<Testimonial> {
    Ok(Testimonial {
        id: row.i64("id")?,
        author_name: row.string("author_name")?,
        author_role: row.opt_string("author_role")?,
        company: row.opt_string("company")?,
        content: row.string("content")?,
        rating: row.opt_i64("rating")?,
        avatar_url: row.opt_string("avatar_url")?,
        is_published: row.boolean("is_published")?,
        sort_order: row.i64("sort_order")?,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
    })
}
