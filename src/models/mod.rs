//! Data models
//!
//! This module contains all data structures used throughout the Dawan
//! publishing backend. Models represent:
//! - Database entities (Post, Podcast, Subscriber, User, Session, MediaItem)
//! - API request/response inputs
//! - Pagination containers

mod media;
mod podcast;
mod post;
mod session;
mod subscriber;
mod user;

pub use media::MediaItem;
pub use podcast::{CreatePodcastInput, Podcast, UpdatePodcastInput};
pub use post::{CreatePostInput, ListParams, PagedResult, Post, PostStatus, UpdatePostInput};
pub use session::Session;
pub use subscriber::{Subscriber, SubscriberStatus};
pub use user::{CreateUserInput, User, UserRole};
