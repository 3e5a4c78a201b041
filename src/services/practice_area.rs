//! Practice areas, shown on the public site as the firm's "services"

use crate::cache::{keys, CacheLayer, SharedCache};
use crate::config::SiteConfig;
use crate::db::repositories::PracticeAreaRepository;
use crate::models::{CreatePracticeAreaInput, OrderItem, PracticeArea, UpdatePracticeAreaInput};
use crate::services::error::{clean_optional, require_text, ServiceError, ServiceResult};
use crate::services::markdown::MarkdownRenderer;
use crate::services::reorder;
use crate::services::seo::PageMeta;
use crate::services::slug::{generate_slug, numbered_slug};
use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Public practice area page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeAreaDetail {
    pub area: PracticeArea,
    pub meta: PageMeta,
}

pub struct PracticeAreaService {
    repo: Arc<dyn PracticeAreaRepository>,
    cache: SharedCache,
    markdown: MarkdownRenderer,
    site: SiteConfig,
}

impl PracticeAreaService {
    pub fn new(repo: Arc<dyn PracticeAreaRepository>, cache: SharedCache, site: SiteConfig) -> Self {
        Self {
            repo,
            cache,
            markdown: MarkdownRenderer::new(),
            site,
        }
    }

    /// Active areas in display order
    pub async fn list_active(&self) -> ServiceResult<Vec<PracticeArea>> {
        if let Some(cached) = self
            .cache
            .get::<Vec<PracticeArea>>(keys::SERVICES_ACTIVE)
            .await
            .ok()
            .flatten()
        {
            return Ok(cached);
        }
        let areas = self.repo.list(true).await.context("Failed to list practice areas")?;
        let _ = self
            .cache
            .set(keys::SERVICES_ACTIVE, &areas, self.cache.default_ttl())
            .await;
        Ok(areas)
    }

    /// Public detail page; inactive areas are not found
    pub async fn get_active(&self, slug: &str) -> ServiceResult<PracticeAreaDetail> {
        let cache_key = keys::service(slug);
        if let Some(cached) = self.cache.get::<PracticeAreaDetail>(&cache_key).await.ok().flatten() {
            return Ok(cached);
        }

        let area = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get practice area")?
            .filter(|area| area.is_active)
            .ok_or_else(|| ServiceError::not_found("Practice area"))?;
        let detail = PracticeAreaDetail {
            meta: PageMeta::for_practice_area(&self.site, &area),
            area,
        };
        let _ = self.cache.set(&cache_key, &detail, self.cache.default_ttl()).await;
        Ok(detail)
    }

    /// Every area in display order
    pub async fn list(&self) -> ServiceResult<Vec<PracticeArea>> {
        let areas = self.repo.list(false).await.context("Failed to list practice areas")?;
        Ok(areas)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<PracticeArea> {
        self.require(id).await
    }

    /// Create at the end of the display order
    pub async fn create(&self, input: CreatePracticeAreaInput) -> ServiceResult<PracticeArea> {
        require_text("title", &input.title)?;
        let slug = self.resolve_slug(input.slug.as_deref(), &input.title, None).await?;
        let now = Utc::now();

        let area = PracticeArea {
            id: 0,
            slug,
            title: input.title.trim().to_string(),
            summary: input.summary.trim().to_string(),
            description_html: self.markdown.render(&input.description),
            description: input.description,
            icon: clean_optional(input.icon),
            is_active: input.is_active.unwrap_or(true),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        };
        let created = self
            .repo
            .create(&area)
            .await
            .context("Failed to create practice area")?;
        self.invalidate().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdatePracticeAreaInput) -> ServiceResult<PracticeArea> {
        let mut area = self.require(id).await?;

        if let Some(title) = input.title {
            require_text("title", &title)?;
            area.title = title.trim().to_string();
        }
        if let Some(slug) = input.slug.as_deref() {
            if slug.trim() != area.slug {
                area.slug = self.resolve_slug(Some(slug), &area.title, Some(id)).await?;
            }
        }
        if let Some(summary) = input.summary {
            area.summary = summary.trim().to_string();
        }
        if let Some(description) = input.description {
            area.description_html = self.markdown.render(&description);
            area.description = description;
        }
        if input.icon.is_some() {
            area.icon = clean_optional(input.icon);
        }
        if let Some(is_active) = input.is_active {
            area.is_active = is_active;
        }

        let updated = self
            .repo
            .update(&area)
            .await
            .context("Failed to update practice area")?;
        self.invalidate().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete practice area")?;
        self.invalidate().await?;
        Ok(())
    }

    pub async fn toggle_active(&self, id: i64) -> ServiceResult<PracticeArea> {
        let mut area = self.require(id).await?;
        area.is_active = !area.is_active;
        let updated = self
            .repo
            .update(&area)
            .await
            .context("Failed to update practice area")?;
        self.invalidate().await?;
        Ok(updated)
    }

    /// Rewrite the whole display order; returns every area in its new order
    pub async fn reorder(&self, items: &[OrderItem]) -> ServiceResult<Vec<PracticeArea>> {
        let ids = self.repo.ids_in_order().await.context("Failed to load practice areas")?;
        let positions = reorder::normalize(items, &ids)?;
        let applied = self
            .repo
            .apply_order(&positions)
            .await
            .context("Failed to reorder practice areas")?;
        if !applied {
            return Err(ServiceError::conflict(
                "The list changed while reordering, reload and try again",
            ));
        }
        self.invalidate().await?;
        self.list().await
    }

    pub async fn count_active(&self) -> ServiceResult<i64> {
        let count = self.repo.count_active().await.context("Failed to count practice areas")?;
        Ok(count)
    }

    async fn require(&self, id: i64) -> ServiceResult<PracticeArea> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get practice area")?
            .ok_or_else(|| ServiceError::not_found("Practice area"))
    }

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
            base = "service".to_string();
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
        self.cache.delete_pattern(keys::SERVICES_PATTERN).await?;
        Ok(())
    }
}
