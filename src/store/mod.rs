//! Persistence for feeds, posts, users and follows.
//!
//! Two traits split the surface by consumer:
//!
//! | Trait | Used by | Covers |
//! |-------|---------|--------|
//! | [`FeedStore`] | scraper, feed commands | feed selection, fetch stamps, post insertion |
//! | [`AccountStore`] | account commands | users, follows, browsing |
//!
//! [`PgStore`] implements both on PostgreSQL. Tests use the in-memory
//! store in [`memory`].
//!
//! Unique keys are enforced by the store and reported as
//! [`StoreError::Duplicate`]: post link, feed URL, user name and the
//! (user, feed) follow pair.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use crate::error::StoreError;
use crate::models::{Feed, FeedFollow, Post, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use postgres::PgStore;

pub trait FeedStore {
    /// The feed fetched longest ago; never-fetched feeds come first.
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError>;

    /// Stamp a fetch attempt on `feed_id`.
    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Insert a post. An existing link yields [`StoreError::Duplicate`].
    async fn insert_entry(&self, post: &Post) -> Result<(), StoreError>;

    async fn list_feeds(&self) -> Result<Vec<Feed>, StoreError>;

    async fn create_feed(&self, name: &str, url: &str, user_id: Uuid) -> Result<Feed, StoreError>;

    async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError>;
}

pub trait AccountStore {
    async fn create_user(&self, name: &str) -> Result<User, StoreError>;

    async fn user_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// All users ordered by name.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Delete every user along with their feeds, follows and posts.
    async fn reset_users(&self) -> Result<(), StoreError>;

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow, StoreError>;

    async fn follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>, StoreError>;

    /// Remove the follow of the feed at `url`. Returns `false` if there was none.
    async fn delete_follow(&self, user_id: Uuid, url: &str) -> Result<bool, StoreError>;

    /// Latest posts from followed feeds, newest publish date first.
    async fn posts_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Post>, StoreError>;
}
