//! API layer - HTTP handlers and routing
//!
//! Everything JSON lives under `/api/v1`. Public endpoints serve the
//! marketing site, authenticated endpoints back the staff dashboard and
//! user management is restricted to admins. `sitemap.xml` and `robots.txt`
//! are served from the site root.

pub mod auth;
pub mod blog;
pub mod common;
pub mod contacts;
pub mod dashboard;
pub mod estimate;
pub mod leads;
pub mod middleware;
pub mod newsletter;
pub mod services;
pub mod site;
pub mod testimonials;
pub mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::post,
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::cache::create_cache;
use crate::config::{Config, ServerConfig, SiteConfig};
use crate::db::repositories::{
    SqlxBlogPostRepository, SqlxContactRepository, SqlxLeadRepository,
    SqlxPracticeAreaRepository, SqlxSessionRepository, SqlxSubscriberRepository,
    SqlxTestimonialRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    create_mailer, BlogService, ContactNotifier, ContactService, DashboardService, FeeCalculator,
    LeadService, NewsletterService, PracticeAreaService, RateLimiter, TestimonialService,
    UserService,
};

pub use middleware::{ApiError, AuthenticatedUser, RequestStats};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteConfig>,
    pub user_service: Arc<UserService>,
    pub lead_service: Arc<LeadService>,
    pub contact_service: Arc<ContactService>,
    pub blog_service: Arc<BlogService>,
    pub practice_area_service: Arc<PracticeAreaService>,
    pub testimonial_service: Arc<TestimonialService>,
    pub newsletter_service: Arc<NewsletterService>,
    pub dashboard_service: Arc<DashboardService>,
    pub fee_calculator: Arc<FeeCalculator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services on top of a migrated pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let cache = create_cache(&config.cache);

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let lead_repo = SqlxLeadRepository::boxed(pool.clone());
        let contact_repo = SqlxContactRepository::boxed(pool.clone());

        let notifier = create_mailer(&config.mail).map(|mailer| ContactNotifier {
            mailer,
            notify_to: config.mail.notify_to.clone(),
            site_name: config.site.name.clone(),
        });

        let user_service = Arc::new(UserService::with_session_expiration(
            user_repo.clone(),
            session_repo,
            config.auth.session_days,
        ));
        let lead_service = Arc::new(LeadService::new(lead_repo.clone(), user_repo));
        let contact_service =
            Arc::new(ContactService::new(contact_repo, lead_repo).with_notifier(notifier));
        let blog_service = Arc::new(BlogService::new(
            SqlxBlogPostRepository::boxed(pool.clone()),
            cache.clone(),
            config.site.clone(),
        ));
        let practice_area_service = Arc::new(PracticeAreaService::new(
            SqlxPracticeAreaRepository::boxed(pool.clone()),
            cache.clone(),
            config.site.clone(),
        ));
        let testimonial_service = Arc::new(TestimonialService::new(
            SqlxTestimonialRepository::boxed(pool.clone()),
            cache,
        ));
        let newsletter_service =
            Arc::new(NewsletterService::new(SqlxSubscriberRepository::boxed(pool)));

        let dashboard_service = Arc::new(DashboardService::new(
            lead_service.clone(),
            contact_service.clone(),
            blog_service.clone(),
            newsletter_service.clone(),
            practice_area_service.clone(),
            testimonial_service.clone(),
        ));

        Self {
            site: Arc::new(config.site.clone()),
            user_service,
            lead_service,
            contact_service,
            blog_service,
            practice_area_service,
            testimonial_service,
            newsletter_service,
            dashboard_service,
            fee_calculator: Arc::new(FeeCalculator::from_config(&config.pricing)),
            rate_limiter: Arc::new(RateLimiter::new()),
            request_stats: Arc::new(RequestStats::new()),
        }
    }
}

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin/users", users::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Staff routes (admin or editor)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/leads", leads::router())
        .nest("/contacts", contacts::router())
        .nest("/admin/blog", blog::admin_router())
        .nest("/admin/services", services::admin_router())
        .nest("/admin/testimonials", testimonials::admin_router())
        .nest("/admin/newsletter", newsletter::admin_router())
        .nest("/admin/dashboard", dashboard::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/site", site::router())
        .nest("/auth", auth::public_router())
        .nest("/services", services::public_router())
        .nest("/testimonials", testimonials::public_router())
        .nest("/blog", blog::public_router())
        .nest("/newsletter", newsletter::public_router())
        .nest("/estimate", estimate::router())
        .route("/contacts", post(contacts::submit))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match server.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(
            "Ignoring invalid CORS origin '{}', cross-origin requests will be refused",
            server.cors_origin
        ),
    }

    let mut router = Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .merge(site::root_router());

    // Built frontend, served for everything the API does not claim
    if let Some(dir) = &server.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}
