//! Client testimonials

use crate::cache::{keys, CacheLayer, SharedCache};
use crate::db::repositories::TestimonialRepository;
use crate::models::{CreateTestimonialInput, OrderItem, Testimonial, UpdateTestimonialInput};
use crate::services::error::{clean_optional, require_text, ServiceError, ServiceResult};
use crate::services::reorder;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub struct TestimonialService {
    repo: Arc<dyn TestimonialRepository>,
    cache: SharedCache,
}

impl TestimonialService {
    pub fn new(repo: Arc<dyn TestimonialRepository>, cache: SharedCache) -> Self {
        Self { repo, cache }
    }

    /// Published testimonials in display order
    pub async fn list_published(&self) -> ServiceResult<Vec<Testimonial>> {
        if let Some(cached) = self
            .cache
            .get::<Vec<Testimonial>>(keys::TESTIMONIALS_PUBLISHED)
            .await
            .ok()
            .flatten()
        {
            return Ok(cached);
        }
        let testimonials = self.repo.list(true).await.context("Failed to list testimonials")?;
        let _ = self
            .cache
            .set(keys::TESTIMONIALS_PUBLISHED, &testimonials, self.cache.default_ttl())
            .await;
        Ok(testimonials)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Testimonial>> {
        let testimonials = self.repo.list(false).await.context("Failed to list testimonials")?;
        Ok(testimonials)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Testimonial> {
        self.require(id).await
    }

    pub async fn create(&self, input: CreateTestimonialInput) -> ServiceResult<Testimonial> {
        require_text("author_name", &input.author_name)?;
        require_text("content", &input.content)?;
        validate_rating(input.rating)?;

        let now = Utc::now();
        let testimonial = Testimonial {
            id: 0,
            author_name: input.author_name.trim().to_string(),
            author_role: clean_optional(input.author_role),
            company: clean_optional(input.company),
            content: input.content.trim().to_string(),
            rating: input.rating,
            avatar_url: clean_optional(input.avatar_url),
            is_published: input.is_published,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        };
        let created = self
            .repo
            .create(&testimonial)
            .await
            .context("Failed to create testimonial")?;
        self.invalidate().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: UpdateTestimonialInput) -> ServiceResult<Testimonial> {
        let mut testimonial = self.require(id).await?;

        if let Some(author_name) = input.author_name {
            require_text("author_name", &author_name)?;
            testimonial.author_name = author_name.trim().to_string();
        }
        if let Some(content) = input.content {
            require_text("content", &content)?;
            testimonial.content = content.trim().to_string();
        }
        if input.rating.is_some() {
            validate_rating(input.rating)?;
            testimonial.rating = input.rating;
        }
        if input.author_role.is_some() {
            testimonial.author_role = clean_optional(input.author_role);
        }
        if input.company.is_some() {
            testimonial.company = clean_optional(input.company);
        }
        if input.avatar_url.is_some() {
            testimonial.avatar_url = clean_optional(input.avatar_url);
        }
        if let Some(is_published) = input.is_published {
            testimonial.is_published = is_published;
        }

        let updated = self
            .repo
            .update(&testimonial)
            .await
            .context("Failed to update testimonial")?;
        self.invalidate().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete testimonial")?;
        self.invalidate().await?;
        Ok(())
    }

    pub async fn toggle_publish(&self, id: i64) -> ServiceResult<Testimonial> {
        let mut testimonial = self.require(id).await?;
        testimonial.is_published = !testimonial.is_published;
        let updated = self
            .repo
            .update(&testimonial)
            .await
            .context("Failed to update testimonial")?;
        self.invalidate().await?;
        Ok(updated)
    }

    pub async fn reorder(&self, items: &[OrderItem]) -> ServiceResult<Vec<Testimonial>> {
        let ids = self.repo.ids_in_order().await.context("Failed to load testimonials")?;
        let positions = reorder::normalize(items, &ids)?;
        let applied = self
            .repo
            .apply_order(&positions)
            .await
            .context("Failed to reorder testimonials")?;
        if !applied {
            return Err(ServiceError::conflict(
                "The list changed while reordering, reload and try again",
            ));
        }
        self.invalidate().await?;
        self.list().await
    }

    pub async fn count_published(&self) -> ServiceResult<i64> {
        let count = self
            .repo
            .count_published()
            .await
            .context("Failed to count testimonials")?;
        Ok(count)
    }

    async fn require(&self, id: i64) -> ServiceResult<Testimonial> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get testimonial")?
            .ok_or_else(|| ServiceError::not_found("Testimonial"))
    }

    async fn invalidate(&self) -> ServiceResult<()> {
        self.cache.delete_pattern(keys::TESTIMONIALS_PATTERN).await?;
        Ok(())
    }
}

fn validate_rating(rating: Option<i64>) -> ServiceResult<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => {
            Err(ServiceError::validation("rating must be between 1 and 5"))
        }
        _ => Ok(()),
    }
}
