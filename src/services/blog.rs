//! Blog service
//!
//! Posts are written in Markdown and rendered once on save. The public side
//! only ever sees published posts; listings and detail pages are cached
//! under the `blog:` prefix and dropped on every admin write.

use crate::cache::{keys, CacheLayer, SharedCache};
use crate::config::SiteConfig;
use crate::db::repositories::BlogPostRepository;
use crate::models::{
    BlogPost, CategoryCount, CreatePostInput, ListParams, PagedResult, PostFilter, PostStatus,
    UpdatePostInput,
};
use crate::services::error::{clean_optional, require_text, ServiceError, ServiceResult};
use crate::services::markdown::MarkdownRenderer;
use crate::services::seo::PageMeta;
use crate::services::slug::{generate_slug, numbered_slug};
use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Related posts shown under a post
const RELATED_LIMIT: i64 = 3;

/// Public post page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: BlogPost,
    pub meta: PageMeta,
    pub related: Vec<BlogPost>,
}

/// Public listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicPostQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

pub struct BlogService {
    repo: Arc<dyn BlogPostRepository>,
    cache: SharedCache,
    markdown: MarkdownRenderer,
    site: SiteConfig,
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogPostRepository>, cache: SharedCache, site: SiteConfig) -> Self {
        Self {
            repo,
            cache,
            markdown: MarkdownRenderer::new(),
            site,
        }
    }

    // ---- public ----

    pub async fn list_published(
        &self,
        query: &PublicPostQuery,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<BlogPost>> {
        let filter = PostFilter {
            status: Some(PostStatus::Published),
            category: clean_optional(query.category.clone()),
            tag: clean_optional(query.tag.clone()),
            search: clean_optional(query.search.clone()),
        };
        let cache_key = keys::blog_list(
            params.page,
            params.per_page,
            filter.category.as_deref(),
            filter.tag.as_deref(),
            filter.search.as_deref(),
        );
        if let Some(cached) = self.cache.get::<PagedResult<BlogPost>>(&cache_key).await.ok().flatten() {
            return Ok(cached);
        }

        let (posts, total) = self
            .repo
            .list(&filter, params)
            .await
            .context("Failed to list posts")?;
        let result = PagedResult::new(posts, total, params);
        let _ = self.cache.set(&cache_key, &result, self.cache.default_ttl()).await;
        Ok(result)
    }

    /// A published post with its metadata and related posts; counts a view
    pub async fn get_published(&self, slug: &str) -> ServiceResult<PostDetail> {
        let cache_key = keys::blog_post(slug);
        if let Some(detail) = self.cache.get::<PostDetail>(&cache_key).await.ok().flatten() {
            self.repo
                .increment_views(detail.post.id)
                .await
                .context("Failed to count view")?;
            return Ok(detail);
        }

        let mut post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post")?
            .filter(BlogPost::is_published)
            .ok_or_else(|| ServiceError::not_found("Post"))?;

        self.repo
            .increment_views(post.id)
            .await
            .context("Failed to count view")?;
        post.view_count += 1;

        let related = match &post.category {
            Some(category) => self
                .repo
                .related(category, post.id, RELATED_LIMIT)
                .await
                .context("Failed to load related posts")?,
            None => Vec::new(),
        };

        let detail = PostDetail {
            meta: PageMeta::for_post(&self.site, &post),
            post,
            related,
        };
        let _ = self.cache.set(&cache_key, &detail, self.cache.default_ttl()).await;
        Ok(detail)
    }

    pub async fn categories(&self) -> ServiceResult<Vec<CategoryCount>> {
        if let Some(cached) = self
            .cache
            .get::<Vec<CategoryCount>>(keys::BLOG_CATEGORIES)
            .await
            .ok()
            .flatten()
        {
            return Ok(cached);
        }
        let categories = self.repo.categories().await.context("Failed to list categories")?;
        let _ = self
            .cache
            .set(keys::BLOG_CATEGORIES, &categories, self.cache.default_ttl())
            .await;
        Ok(categories)
    }

    /// Every published post, for the sitemap
    pub async fn all_published(&self) -> ServiceResult<Vec<BlogPost>> {
        let posts = self.repo.list_published().await.context("Failed to list posts")?;
        Ok(posts)
    }

    // ---- admin ----

    pub async fn list(&self, status: Option<&str>, search: Option<String>, params: &ListParams) -> ServiceResult<PagedResult<BlogPost>> {
        let filter = PostFilter {
            status: status.map(parse_status).transpose()?,
            search: clean_optional(search),
            ..Default::default()
        };
        let (posts, total) = self
            .repo
            .list(&filter, params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(posts, total, params))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<BlogPost> {
        self.require(id).await
    }

    pub async fn create(&self, input: CreatePostInput, author_id: Option<i64>) -> ServiceResult<BlogPost> {
        require_text("title", &input.title)?;
        require_text("content", &input.content)?;

        let slug = self.resolve_slug(input.slug.as_deref(), &input.title, None).await?;
        let excerpt = clean_optional(input.excerpt).unwrap_or_else(|| self.markdown.excerpt(&input.content));
        let now = Utc::now();

        let post = BlogPost {
            id: 0,
            slug,
            title: input.title.trim().to_string(),
            excerpt,
            content_html: self.markdown.render(&input.content),
            reading_minutes: self.markdown.reading_minutes(&input.content),
            content: input.content,
            cover_image: clean_optional(input.cover_image),
            category: clean_optional(input.category),
            tags: clean_tags(input.tags),
            author_id,
            status: input.status,
            seo_title: clean_optional(input.seo_title),
            seo_description: clean_optional(input.seo_description),
            view_count: 0,
            published_at: (input.status == PostStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&post).await.context("Failed to create post")?;
        self.invalidate().await?;
        tracing::info!("Post {} created ({})", created.slug, created.status);
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdatePostInput) -> ServiceResult<BlogPost> {
        let mut post = self.require(id).await?;

        if let Some(title) = input.title {
            require_text("title", &title)?;
            post.title = title.trim().to_string();
        }
        if let Some(slug) = input.slug.as_deref() {
            if slug.trim() != post.slug {
                post.slug = self.resolve_slug(Some(slug), &post.title, Some(id)).await?;
            }
        }
        if let Some(content) = input.content {
            require_text("content", &content)?;
            // Follow the content only while the excerpt is still the derived one
            if post.excerpt == self.markdown.excerpt(&post.content) {
                post.excerpt = self.markdown.excerpt(&content);
            }
            post.content_html = self.markdown.render(&content);
            post.reading_minutes = self.markdown.reading_minutes(&content);
            post.content = content;
        }
        if let Some(excerpt) = input.excerpt {
            post.excerpt = clean_optional(Some(excerpt)).unwrap_or_else(|| self.markdown.excerpt(&post.content));
        }
        if input.cover_image.is_some() {
            post.cover_image = clean_optional(input.cover_image);
        }
        if input.category.is_some() {
            post.category = clean_optional(input.category);
        }
        if let Some(tags) = input.tags {
            post.tags = clean_tags(tags);
        }
        if input.seo_title.is_some() {
            post.seo_title = clean_optional(input.seo_title);
        }
        if input.seo_description.is_some() {
            post.seo_description = clean_optional(input.seo_description);
        }
        if let Some(status) = input.status {
            set_status(&mut post, status);
        }

        let updated = self.repo.update(&post).await.context("Failed to update post")?;
        self.invalidate().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete post")?;
        self.invalidate().await?;
        Ok(())
    }

    /// Draft ⇄ published. The first publish stamps `published_at`, which is
    /// kept when the post goes back to draft.
    pub async fn toggle_publish(&self, id: i64) -> ServiceResult<BlogPost> {
        let mut post = self.require(id).await?;
        let target = match post.status {
            PostStatus::Draft => PostStatus::Published,
            PostStatus::Published => PostStatus::Draft,
        };
        set_status(&mut post, target);

        let updated = self.repo.update(&post).await.context("Failed to update post")?;
        self.invalidate().await?;
        tracing::info!("Post {} is now {}", updated.slug, updated.status);
        Ok(updated)
    }

    pub async fn count_by_status(&self, status: PostStatus) -> ServiceResult<i64> {
        let count = self
            .repo
            .count_by_status(status)
            .await
            .context("Failed to count posts")?;
        Ok(count)
    }

    async fn require(&self, id: i64) -> ServiceResult<BlogPost> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found("Post"))
    }

    /// An explicit slug must be free; a derived one is numbered until it is
    async fn resolve_slug(&self, explicit: Option<&str>, title: &str, exclude_id: Option<i64>) -> ServiceResult<String> {
        if let Some(explicit) = explicit.filter(|s| !s.trim().is_empty()) {
            let slug = generate_slug(explicit);
            if slug.is_empty() {
                return Err(ServiceError::validation("slug must contain letters or digits"));
            }
            if self.repo.slug_exists(&slug, exclude_id).await.context("Failed to check slug")? {
                return Err(ServiceError::conflict(format!("Slug '{}' is already in use", slug)));
            }
            return Ok(slug);
        }

        let mut base = generate_slug(title);
        if base.is_empty() {
            base = "post".to_string();
        }
        let mut attempt = 1;
        loop {
            let candidate = numbered_slug(&base, attempt);
            if !self
                .repo
                .slug_exists(&candidate, exclude_id)
                .await
                .context("Failed to check slug")?
            {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    async fn invalidate(&self) -> ServiceResult<()> {
        self.cache.delete_pattern(keys::BLOG_PATTERN).await?;
        Ok(())
    }
}

fn set_status(post: &mut BlogPost, status: PostStatus) {
    post.status = status;
    if status == PostStatus::Published && post.published_at.is_none() {
        post.published_at = Some(Utc::now());
    }
}

/// Trim, drop blanks and duplicates, keep first-seen order
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

fn parse_status(value: &str) -> ServiceResult<PostStatus> {
    PostStatus::from_str(value).map_err(|_| {
        ServiceError::validation(format!(
            "Invalid status '{}'. Valid values: {}",
            value,
            PostStatus::values().join(", ")
        ))
    })
}
