//! Services layer - business logic
//!
//! Services sit between the API handlers and the repositories. They own
//! validation, slug and token generation, cache invalidation and the
//! spoken-audio lifecycle; handlers stay thin.

pub mod email;
pub mod newsletter;
pub mod password;
pub mod podcast;
pub mod post;
pub mod rate_limiter;
pub mod token;
pub mod user;

pub use email::{CampaignReport, EmailService};
pub use newsletter::{NewsletterService, NewsletterServiceError};
pub use password::{hash_password, verify_password};
pub use podcast::{PodcastService, PodcastServiceError};
pub use post::{generate_slug, PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
