//! Blog post repository
//!
//! Tags are stored as a JSON array in a text column; the tag filter matches
//! the quoted tag inside that array.

use crate::db::{like_pattern, with_pool, DbRow, DynDatabasePool, InsertId};
use crate::models::{BlogPost, CategoryCount, ListParams, PostFilter, PostStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, content_html, cover_image, category, tags, \
     author_id, status, seo_title, seo_description, reading_minutes, view_count, published_at, \
     created_at, updated_at";

const POST_FILTER: &str = "(? IS NULL OR status = ?) AND (? IS NULL OR category = ?) \
     AND (? IS NULL OR tags LIKE ?) AND (? IS NULL OR title LIKE ? OR excerpt LIKE ?)";

#[async_trait]
pub trait BlogPostRepository: Send + Sync {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    /// Whether a post other than `exclude_id` uses `slug`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Persist every mutable field
    async fn update(&self, post: &BlogPost) -> Result<BlogPost>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Filtered list, most recently published (or created) first
    async fn list(&self, filter: &PostFilter, params: &ListParams)
        -> Result<(Vec<BlogPost>, i64)>;

    /// Every published post, newest first
    async fn list_published(&self) -> Result<Vec<BlogPost>>;

    async fn increment_views(&self, id: i64) -> Result<()>;

    /// Published posts in `category`, excluding `exclude_id`
    async fn related(&self, category: &str, exclude_id: i64, limit: i64) -> Result<Vec<BlogPost>>;

    /// Categories of published posts with their post counts
    async fn categories(&self) -> Result<Vec<CategoryCount>>;

    async fn count_by_status(&self, status: PostStatus) -> Result<i64>;
}

pub struct SqlxBlogPostRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogPostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_by(&self, column: &str, value: Value<'_>) -> Result<Option<BlogPost>> {
        let sql = format!("SELECT {} FROM blog_posts WHERE {} = ?", POST_COLUMNS, column);
        with_pool!(self.pool, pool => {
            let query = sqlx::query(&sql);
            let query = match value {
                Value::Id(id) => query.bind(id),
                Value::Text(text) => query.bind(text),
            };
            let row = query
                .fetch_optional(pool)
                .await
                .with_context(|| format!("Failed to get post by {}", column))?;
            row.as_ref().map(post_from_row).transpose()
        })
    }
}

enum Value<'a> {
    Id(i64),
    Text(&'a str),
}

#[async_trait]
impl BlogPostRepository for SqlxBlogPostRepository {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost> {
        let now = Utc::now();
        let tags = serde_json::to_string(&post.tags).context("Failed to encode tags")?;
        let id = with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                INSERT INTO blog_posts (slug, title, excerpt, content, content_html, cover_image, category,
                                        tags, author_id, status, seo_title, seo_description, reading_minutes,
                                        view_count, published_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.content_html)
            .bind(&post.cover_image)
            .bind(&post.category)
            .bind(&tags)
            .bind(post.author_id)
            .bind(post.status.as_str())
            .bind(&post.seo_title)
            .bind(&post.seo_description)
            .bind(post.reading_minutes)
            .bind(post.view_count)
            .bind(post.published_at)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .context("Failed to create blog post")?
            .insert_id()
        });

        Ok(BlogPost {
            id,
            created_at: now,
            updated_at: now,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>> {
        self.fetch_one_by("id", Value::Id(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        self.fetch_one_by("slug", Value::Text(slug)).await
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        with_pool!(self.pool, pool => {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM blog_posts WHERE slug = ? AND (? IS NULL OR id <> ?)",
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

    async fn update(&self, post: &BlogPost) -> Result<BlogPost> {
        let now = Utc::now();
        let tags = serde_json::to_string(&post.tags).context("Failed to encode tags")?;
        with_pool!(self.pool, pool => {
            sqlx::query(
                r#"
                UPDATE blog_posts
                SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_image = ?,
                    category = ?, tags = ?, status = ?, seo_title = ?, seo_description = ?,
                    reading_minutes = ?, published_at = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.content_html)
            .bind(&post.cover_image)
            .bind(&post.category)
            .bind(&tags)
            .bind(post.status.as_str())
            .bind(&post.seo_title)
            .bind(&post.seo_description)
            .bind(post.reading_minutes)
            .bind(post.published_at)
            .bind(now)
            .bind(post.id)
            .execute(pool)
            .await
            .context("Failed to update blog post")?;
        });

        Ok(BlogPost {
            updated_at: now,
            ..post.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("DELETE FROM blog_posts WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete blog post")?;
        });
        Ok(())
    }

    async fn list(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<(Vec<BlogPost>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let category = filter.category.as_deref().filter(|c| !c.trim().is_empty());
        let tag = filter
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| format!("%\"{}\"%", t));
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let count_sql = format!("SELECT COUNT(*) AS count FROM blog_posts WHERE {}", POST_FILTER);
        let list_sql = format!(
            "SELECT {} FROM blog_posts WHERE {} \
             ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, POST_FILTER
        );

        with_pool!(self.pool, pool => {
            let total = sqlx::query(&count_sql)
                .bind(status)
                .bind(status)
                .bind(category)
                .bind(category)
                .bind(&tag)
                .bind(&tag)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .fetch_one(pool)
                .await
                .context("Failed to count blog posts")?
                .i64("count")?;
            let rows = sqlx::query(&list_sql)
                .bind(status)
                .bind(status)
                .bind(category)
                .bind(category)
                .bind(&tag)
                .bind(&tag)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await
                .context("Failed to list blog posts")?;
            let posts = rows.iter().map(post_from_row).collect::<Result<Vec<_>>>()?;
            Ok((posts, total))
        })
    }

    async fn list_published(&self) -> Result<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {} FROM blog_posts WHERE status = ? ORDER BY published_at DESC, id DESC",
            POST_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .bind(PostStatus::Published.as_str())
                .fetch_all(pool)
                .await
                .context("Failed to list published posts")?;
            rows.iter().map(post_from_row).collect()
        })
    }

    async fn increment_views(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, pool => {
            sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to increment view count")?;
        });
        Ok(())
    }

    async fn related(&self, category: &str, exclude_id: i64, limit: i64) -> Result<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {} FROM blog_posts WHERE status = ? AND category = ? AND id <> ? \
             ORDER BY published_at DESC, id DESC LIMIT ?",
            POST_COLUMNS
        );
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(&sql)
                .bind(PostStatus::Published.as_str())
                .bind(category)
                .bind(exclude_id)
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to load related posts")?;
            rows.iter().map(post_from_row).collect()
        })
    }

    async fn categories(&self) -> Result<Vec<CategoryCount>> {
        with_pool!(self.pool, pool => {
            let rows = sqlx::query(
                r#"
                SELECT category, COUNT(*) AS count
                FROM blog_posts
                WHERE status = ? AND category IS NOT NULL AND category <> ''
                GROUP BY category
                ORDER BY count DESC, category ASC
                "#,
            )
            .bind(PostStatus::Published.as_str())
            .fetch_all(pool)
            .await
            .context("Failed to list categories")?;
            rows.iter().map(category_from_row).collect()
        })
    }

    async fn count_by_status(&self, status: PostStatus) -> Result<i64> {
        with_pool!(self.pool, pool => {
            sqlx::query("SELECT COUNT(*) AS count FROM blog_posts WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(pool)
                .await
                .context("Failed to count blog posts")?
                .i64("count")
        })
    }
}

fn post_from_row<R: DbRow>(row: &R) -> Result<BlogPost> {
    let tags: Vec<String> =
        serde_json::from_str(&row.string("tags")?).context("Invalid tags column")?;
    Ok(BlogPost {
        id: row.i64("id")?,
        slug: row.string("slug")?,
        title: row.string("title")?,
        excerpt: row.string("excerpt")?,
        content: row.string("content")?,
        content_html: row.string("content_html")?,
        cover_image: row.opt_string("cover_image")?,
        category: row.opt_string("category")?,
        tags,
        author_id: row.opt_i64("author_id")?,
        status: row.string("status")?.parse()?,
        seo_title: row.opt_string("seo_title")?,
        seo_description: row.opt_string("seo_description")?,
        reading_minutes: row.i64("reading_minutes")?,
        view_count: row.i64("view_count")?,
        published_at: row.opt_datetime("published_at")?,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
    })
}

fn category_from_row<R: DbRow>(row: &R) -> Result<CategoryCount> {
    Ok(CategoryCount {
        name: row.string("category")?,
        count: row.i64("count")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxBlogPostRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        SqlxBlogPostRepository::new(pool)
    }

    fn post(slug: &str, category: Option<&str>, tags: &[&str], published: bool) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: 0,
            slug: slug.to_string(),
            title: format!("Title {}", slug),
            excerpt: format!("About {}", slug),
            content: "Body".to_string(),
            content_html: "<p>Body</p>".to_string(),
            cover_image: None,
            category: category.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author_id: None,
            status: if published { PostStatus::Published } else { PostStatus::Draft },
            seo_title: None,
            seo_description: None,
            reading_minutes: 1,
            view_count: 0,
            published_at: published.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&post("labor-rights", Some("Labor"), &["rights", "work"], true))
            .await
            .unwrap();

        let found = repo.get_by_slug("labor-rights").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.tags, vec!["rights", "work"]);
        assert!(repo.slug_exists("labor-rights", None).await.unwrap());
        assert!(!repo.slug_exists("labor-rights", Some(created.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = setup_test_repo().await;
        repo.create(&post("a", Some("Labor"), &["rights"], true)).await.unwrap();
        repo.create(&post("b", Some("Tax"), &["audit"], true)).await.unwrap();
        repo.create(&post("c", Some("Labor"), &[], false)).await.unwrap();

        let params = ListParams::default();
        let published = PostFilter {
            status: Some(PostStatus::Published),
            ..PostFilter::default()
        };
        let (_, total) = repo.list(&published, &params).await.unwrap();
        assert_eq!(total, 2);

        let by_category = PostFilter {
            category: Some("Labor".to_string()),
            ..published.clone()
        };
        let (items, _) = repo.list(&by_category, &params).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "a");

        let by_tag = PostFilter {
            tag: Some("audit".to_string()),
            ..published.clone()
        };
        let (items, _) = repo.list(&by_tag, &params).await.unwrap();
        assert_eq!(items[0].slug, "b");

        let (items, _) = repo
            .list(
                &PostFilter {
                    search: Some("about b".to_string()),
                    ..PostFilter::default()
                },
                &params,
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_published_order_and_related() {
        let repo = setup_test_repo().await;
        let mut older = post("older", Some("Labor"), &[], true);
        older.published_at = Some(Utc::now() - Duration::days(2));
        let older = repo.create(&older).await.unwrap();
        let newer = repo.create(&post("newer", Some("Labor"), &[], true)).await.unwrap();

        let all = repo.list_published().await.unwrap();
        assert_eq!(all[0].id, newer.id);

        let related = repo.related("Labor", newer.id, 3).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, older.id);

        let categories = repo.categories().await.unwrap();
        assert_eq!(
            categories,
            vec![CategoryCount {
                name: "Labor".to_string(),
                count: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_increment_views_and_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(&post("x", None, &[], true)).await.unwrap();
        repo.increment_views(created.id).await.unwrap();
        repo.increment_views(created.id).await.unwrap();
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().view_count, 2);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert_eq!(repo.count_by_status(PostStatus::Published).await.unwrap(), 0);
    }
}
