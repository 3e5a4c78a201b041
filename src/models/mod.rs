//! Data models
//!
//! Database entities, their lifecycle enums and the input types accepted by
//! the service layer. Everything here maps directly to and from JSON.

/// Declare a string-backed enum with `Display`, `FromStr`, serde support and
/// an `ALL` table listing the variants in declaration order.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// All accepted string values, in declaration order
            pub fn values() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(anyhow::anyhow!(
                        "Invalid {}: {}",
                        stringify!($name),
                        s
                    )),
                }
            }
        }
    };
}

mod blog;
mod contact;
mod lead;
mod pagination;
mod practice_area;
mod session;
mod subscriber;
mod testimonial;
mod user;

pub use blog::{BlogPost, CategoryCount, CreatePostInput, PostFilter, PostStatus, UpdatePostInput};
pub use contact::{Contact, ContactStatus, CreateContactInput};
pub use lead::{
    BoardColumn, CreateInteractionInput, CreateLeadInput, InteractionKind, Lead, LeadFilter,
    LeadInteraction, LeadNote, LeadSource, LeadStatus, UpdateLeadInput,
};
pub use pagination::{ListParams, PagedResult};
pub use practice_area::{CreatePracticeAreaInput, PracticeArea, UpdatePracticeAreaInput};
pub use session::Session;
pub use subscriber::{Subscriber, SubscriberStatus};
pub use testimonial::{CreateTestimonialInput, Testimonial, UpdateTestimonialInput};
pub use user::{CreateUserInput, UpdateUserInput, User, UserRole, UserStatus};

/// One `(id, order)` pair of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order: i64,
}
