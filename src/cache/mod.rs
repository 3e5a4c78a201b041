//! Cache layer
//!
//! In-process cache for the public read models: active practice areas,
//! published testimonials, blog listings and post detail pages. Entries are
//! grouped under a key prefix per resource so an admin write can drop every
//! cached view of that resource at once.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lexsite::cache::{create_cache, keys, CacheLayer};
//! use lexsite::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set(keys::SERVICES_ACTIVE, &areas, cache.default_ttl()).await?;
//! cache.delete_pattern(keys::SERVICES_PATTERN).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The generic methods keep this trait from being object safe, so services
/// hold the concrete `Arc<MemoryCache>`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a glob pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// Shared cache handle
pub type SharedCache = Arc<MemoryCache>;

/// Cache keys and invalidation patterns, one prefix per resource
pub mod keys {
    pub const SERVICES_ACTIVE: &str = "services:active";
    pub const SERVICES_PATTERN: &str = "services:*";
    pub const TESTIMONIALS_PUBLISHED: &str = "testimonials:published";
    pub const TESTIMONIALS_PATTERN: &str = "testimonials:*";
    pub const BLOG_CATEGORIES: &str = "blog:categories";
    pub const BLOG_PATTERN: &str = "blog:*";

    pub fn service(slug: &str) -> String {
        format!("services:slug:{}", slug)
    }

    pub fn blog_post(slug: &str) -> String {
        format!("blog:post:{}", slug)
    }

    /// Key of one page of the public blog listing
    pub fn blog_list(
        page: u32,
        per_page: u32,
        category: Option<&str>,
        tag: Option<&str>,
        search: Option<&str>,
    ) -> String {
        format!(
            "blog:list:{}:{}:{}:{}:{}",
            page,
            per_page,
            category.unwrap_or(""),
            tag.unwrap_or(""),
            search.unwrap_or("")
        )
    }
}

/// Create the in-memory cache from configuration
pub fn create_cache(config: &CacheConfig) -> SharedCache {
    let ttl = Duration::from_secs(config.ttl_seconds.max(1));
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}
