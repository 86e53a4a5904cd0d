//! Data models for users, feeds, follows and ingested posts.
//!
//! - [`User`]: a registered reader
//! - [`Feed`]: a registered syndication source, one URL per feed
//! - [`FeedFollow`]: a user following a feed, with joined display names
//! - [`Post`]: one ingested feed item
//! - [`RawFeed`] / [`RawItem`]: transient parse result for a single fetch cycle
//!
//! Persistent rows derive `sqlx::FromRow` so the Postgres store can map
//! query results straight into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl User {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
        }
    }
}

/// A registered feed.
///
/// `last_fetched_at` is `None` until the scraper picks the feed for the first
/// time, which puts it ahead of every feed that has been fetched before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    pub fn new(name: &str, url: &str, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
            url: url.to_string(),
            user_id,
            last_fetched_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub user_name: String,
    pub feed_name: String,
}

/// An ingested feed item. The link (`url`) is unique across all posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
}

impl Post {
    /// Build a candidate post for `feed_id` from a parsed item.
    pub fn from_item(item: &RawItem, published_at: Option<DateTime<Utc>>, feed_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: item.title.clone(),
            url: item.link.clone(),
            description: item.description.clone(),
            published_at,
            feed_id,
        }
    }
}

/// Channel-level data plus items, in document order, with entities decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    /// `None` when the item has no description or an empty one.
    pub description: Option<String>,
    /// Unparsed `pubDate`; empty when the element is missing.
    pub pub_date: String,
}
