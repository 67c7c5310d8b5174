//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod media;
pub mod podcast;
pub mod post;
pub mod session;
pub mod subscriber;
pub mod user;

pub use media::{MediaRepository, SqlxMediaRepository};
pub use podcast::{PodcastRepository, SqlxPodcastRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subscriber::{SubscriberRepository, SqlxSubscriberRepository};
pub use user::{SqlxUserRepository, UserRepository};
