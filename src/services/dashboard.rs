//! Admin dashboard figures

use crate::models::{LeadStatus, PostStatus};
use crate::services::blog::BlogService;
use crate::services::contact::ContactService;
use crate::services::error::ServiceResult;
use crate::services::lead::LeadService;
use crate::services::newsletter::NewsletterService;
use crate::services::practice_area::PracticeAreaService;
use crate::services::testimonial::TestimonialService;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: LeadStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub leads_by_status: Vec<StatusCount>,
    pub open_leads: i64,
    pub won_leads: i64,
    pub pending_contacts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub active_subscribers: i64,
    pub active_practice_areas: i64,
    pub published_testimonials: i64,
}

pub struct DashboardService {
    leads: Arc<LeadService>,
    contacts: Arc<ContactService>,
    blog: Arc<BlogService>,
    newsletter: Arc<NewsletterService>,
    practice_areas: Arc<PracticeAreaService>,
    testimonials: Arc<TestimonialService>,
}

impl DashboardService {
    pub fn new(
        leads: Arc<LeadService>,
        contacts: Arc<ContactService>,
        blog: Arc<BlogService>,
        newsletter: Arc<NewsletterService>,
        practice_areas: Arc<PracticeAreaService>,
        testimonials: Arc<TestimonialService>,
    ) -> Self {
        Self {
            leads,
            contacts,
            blog,
            newsletter,
            practice_areas,
            testimonials,
        }
    }

    pub async fn stats(&self) -> ServiceResult<DashboardStats> {
        let counts = self.leads.counts_by_status().await?;
        let open_leads = counts
            .iter()
            .filter(|(status, _)| !status.is_closed())
            .map(|(_, count)| count)
            .sum();
        let won_leads = counts
            .iter()
            .find(|(status, _)| *status == LeadStatus::Won)
            .map(|(_, count)| *count)
            .unwrap_or(0);

        Ok(DashboardStats {
            leads_by_status: counts
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            open_leads,
            won_leads,
            pending_contacts: self.contacts.count_pending().await?,
            published_posts: self.blog.count_by_status(PostStatus::Published).await?,
            draft_posts: self.blog.count_by_status(PostStatus::Draft).await?,
            active_subscribers: self.newsletter.count_active().await?,
            active_practice_areas: self.practice_areas.count_active().await?,
            published_testimonials: self.testimonials.count_published().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, SiteConfig};
    use crate::db::repositories::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateContactInput, CreateLeadInput, CreatePostInput};

    #[tokio::test]
    async fn test_stats_reflect_content() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default());

        let leads = Arc::new(LeadService::new(
            SqlxLeadRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        ));
        let contacts = Arc::new(ContactService::new(
            SqlxContactRepository::boxed(pool.clone()),
            SqlxLeadRepository::boxed(pool.clone()),
        ));
        let blog = Arc::new(BlogService::new(
            SqlxBlogPostRepository::boxed(pool.clone()),
            cache.clone(),
            SiteConfig::default(),
        ));
        let dashboard = DashboardService::new(
            leads.clone(),
            contacts.clone(),
            blog.clone(),
            Arc::new(NewsletterService::new(SqlxSubscriberRepository::boxed(pool.clone()))),
            Arc::new(PracticeAreaService::new(
                SqlxPracticeAreaRepository::boxed(pool.clone()),
                cache.clone(),
                SiteConfig::default(),
            )),
            Arc::new(TestimonialService::new(
                SqlxTestimonialRepository::boxed(pool),
                cache,
            )),
        );

        for name in ["Ana", "Bruno", "Carla"] {
            leads
                .create(CreateLeadInput {
                    name: name.into(),
                    email: format!("{}@example.com", name.to_lowercase()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        leads.move_status(1, "won", None, None).await.unwrap();
        contacts
            .submit(
                CreateContactInput {
                    name: "Dora".into(),
                    email: "dora@example.com".into(),
                    message: "Hello".into(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        blog.create(
            CreatePostInput {
                title: "Draft".into(),
                content: "Body".into(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let stats = dashboard.stats().await.unwrap();
        assert_eq!(stats.leads_by_status.len(), LeadStatus::ALL.len());
        assert_eq!(stats.open_leads, 2);
        assert_eq!(stats.won_leads, 1);
        assert_eq!(stats.pending_contacts, 1);
        assert_eq!((stats.published_posts, stats.draft_posts), (0, 1));
        assert_eq!(stats.active_subscribers, 0);
    }
}
