//! Services layer - Business logic
//!
//! Services validate input, coordinate repositories and keep the public
//! read cache in step with admin writes. Handlers in `api` stay thin and
//! only translate between HTTP and these calls.

pub mod blog;
pub mod contact;
pub mod dashboard;
pub mod error;
pub mod fee_estimate;
pub mod lead;
pub mod mailer;
pub mod markdown;
pub mod newsletter;
pub mod password;
pub mod practice_area;
pub mod rate_limiter;
pub mod reorder;
pub mod seo;
pub mod slug;
pub mod testimonial;
pub mod user;

pub use blog::{BlogService, PostDetail, PublicPostQuery};
pub use contact::{ContactNotifier, ContactService};
pub use dashboard::{DashboardService, DashboardStats};
pub use error::{ServiceError, ServiceResult};
pub use fee_estimate::{Estimate, EstimateInput, EstimateOptions, FeeCalculator};
pub use lead::{LeadDetail, LeadService, StatusChange};
pub use mailer::{create_mailer, DynMailer, Mailer, SmtpMailer};
pub use markdown::MarkdownRenderer;
pub use newsletter::{NewsletterService, SubscribeInput, SubscribeOutcome};
pub use password::{hash_password, verify_password};
pub use practice_area::{PracticeAreaDetail, PracticeAreaService};
pub use rate_limiter::RateLimiter;
pub use seo::PageMeta;
pub use slug::generate_slug;
pub use testimonial::TestimonialService;
pub use user::{LoginInput, SetupInput, UserService, UserServiceError};
