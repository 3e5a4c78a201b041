//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod blog_post;
pub mod contact;
pub mod lead;
mod ordering;
pub mod practice_area;
pub mod session;
pub mod subscriber;
pub mod testimonial;
pub mod user;

pub use blog_post::{BlogPostRepository, SqlxBlogPostRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use lead::{LeadRepository, SqlxLeadRepository, StatusTransition};
pub use practice_area::{PracticeAreaRepository, SqlxPracticeAreaRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subscriber::{SqlxSubscriberRepository, SubscriberRepository};
pub use testimonial::{SqlxTestimonialRepository, TestimonialRepository};
pub use user::{SqlxUserRepository, UserRepository};
