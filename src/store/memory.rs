//! In-memory store for tests. Mirrors the unique keys and cascade rules
//! of the Postgres schema.

use super::{AccountStore, FeedStore};
use crate::error::StoreError;
use crate::models::{Feed, FeedFollow, Post, User};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct FollowRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    feed_id: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    feeds: Vec<Feed>,
    follows: Vec<FollowRow>,
    posts: Vec<Post>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.tables.read().await.posts.clone()
    }

    pub async fn feed(&self, id: Uuid) -> Option<Feed> {
        self.tables.read().await.feeds.iter().find(|f| f.id == id).cloned()
    }
}

impl Tables {
    fn joined_follow(&self, row: &FollowRow) -> Option<FeedFollow> {
        let user = self.users.iter().find(|u| u.id == row.user_id)?;
        let feed = self.feeds.iter().find(|f| f.id == row.feed_id)?;
        Some(FeedFollow {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.created_at,
            user_id: row.user_id,
            feed_id: row.feed_id,
            user_name: user.name.clone(),
            feed_name: feed.name.clone(),
        })
    }
}

impl FeedStore for MemoryStore {
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .feeds
            .iter()
            .min_by_key(|f| f.last_fetched_at)
            .cloned())
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let feed = tables
            .feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or_else(|| StoreError::NotFound(format!("feed {feed_id}")))?;
        feed.last_fetched_at = Some(at);
        feed.updated_at = at;
        Ok(())
    }

    async fn insert_entry(&self, post: &Post) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.url == post.url) {
            return Err(StoreError::Duplicate(format!("post {}", post.url)));
        }
        if !tables.feeds.iter().any(|f| f.id == post.feed_id) {
            return Err(StoreError::NotFound(format!("feed {}", post.feed_id)));
        }
        tables.posts.push(post.clone());
        Ok(())
    }

    async fn list_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        Ok(self.tables.read().await.feeds.clone())
    }

    async fn create_feed(&self, name: &str, url: &str, user_id: Uuid) -> Result<Feed, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.feeds.iter().any(|f| f.url == url) {
            return Err(StoreError::Duplicate(format!("feed {url}")));
        }
        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        let feed = Feed::new(name, url, user_id);
        tables.feeds.push(feed.clone());
        Ok(feed)
    }

    async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.feeds.iter().find(|f| f.url == url).cloned())
    }
}

impl AccountStore for MemoryStore {
    async fn create_user(&self, name: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.name == name) {
            return Err(StoreError::Duplicate(format!("user {name}")));
        }
        let user = User::new(name);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.name == name).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.tables.read().await.users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn reset_users(&self) -> Result<(), StoreError> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.feed_id == feed_id)
        {
            return Err(StoreError::Duplicate(format!("follow of feed {feed_id}")));
        }
        let row = FollowRow {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_id,
            feed_id,
        };
        let follow = tables
            .joined_follow(&row)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id} or feed {feed_id}")))?;
        tables.follows.push(row);
        Ok(follow)
    }

    async fn follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>, StoreError> {
        let tables = self.tables.read().await;
        let mut follows: Vec<FeedFollow> = tables
            .follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| tables.joined_follow(f))
            .collect();
        follows.sort_by(|a, b| a.feed_name.cmp(&b.feed_name));
        Ok(follows)
    }

    async fn delete_follow(&self, user_id: Uuid, url: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(feed_id) = tables.feeds.iter().find(|f| f.url == url).map(|f| f.id) else {
            return Ok(false);
        };
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.feed_id == feed_id));
        Ok(tables.follows.len() < before)
    }

    async fn posts_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Post>, StoreError> {
        let tables = self.tables.read().await;
        let followed: Vec<Uuid> = tables
            .follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.feed_id)
            .collect();
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| followed.contains(&p.feed_id))
            .cloned()
            .collect();
        // `None < Some`, so reversing puts undated posts last.
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        posts.truncate(limit as usize);
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawItem;
    use chrono::Duration;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store.create_user("alice").await.unwrap();
        (store, user)
    }

    fn post_for(feed_id: Uuid, link: &str, published_at: Option<DateTime<Utc>>) -> Post {
        let item = RawItem {
            title: link.to_string(),
            link: link.to_string(),
            ..Default::default()
        };
        Post::from_item(&item, published_at, feed_id)
    }

    #[tokio::test]
    async fn test_next_feed_prefers_never_fetched_then_oldest() {
        let (store, user) = store_with_user().await;
        let now = Utc::now();
        let recent = store.create_feed("recent", "https://a.example/rss", user.id).await.unwrap();
        let stale = store.create_feed("stale", "https://b.example/rss", user.id).await.unwrap();
        let fresh = store.create_feed("fresh", "https://c.example/rss", user.id).await.unwrap();

        store.mark_fetched(recent.id, now - Duration::minutes(1)).await.unwrap();
        store.mark_fetched(stale.id, now - Duration::hours(3)).await.unwrap();
        let next = store.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, fresh.id);

        store.mark_fetched(fresh.id, now).await.unwrap();
        let next = store.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, stale.id);
    }

    #[tokio::test]
    async fn test_next_feed_on_empty_store() {
        let store = MemoryStore::new();
        assert!(store.next_feed_to_fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_links_are_rejected_once_stored() {
        let (store, user) = store_with_user().await;
        let feed = store.create_feed("blog", "https://blog.example/rss", user.id).await.unwrap();
        let post = post_for(feed.id, "https://blog.example/1", None);

        store.insert_entry(&post).await.unwrap();
        let again = post_for(feed.id, "https://blog.example/1", None);
        let err = store.insert_entry(&again).await.unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(store.posts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_feed_url_and_user_name() {
        let (store, user) = store_with_user().await;
        store.create_feed("one", "https://same.example/rss", user.id).await.unwrap();
        let err = store
            .create_feed("two", "https://same.example/rss", user.id)
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert!(store.create_user("alice").await.unwrap_err().is_duplicate());
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let (store, user) = store_with_user().await;
        let feed = store.create_feed("blog", "https://blog.example/rss", user.id).await.unwrap();

        let follow = store.create_follow(user.id, feed.id).await.unwrap();
        assert_eq!(follow.user_name, "alice");
        assert_eq!(follow.feed_name, "blog");
        assert!(store.create_follow(user.id, feed.id).await.unwrap_err().is_duplicate());

        assert_eq!(store.follows_for_user(user.id).await.unwrap().len(), 1);
        assert!(store.delete_follow(user.id, "https://blog.example/rss").await.unwrap());
        assert!(!store.delete_follow(user.id, "https://blog.example/rss").await.unwrap());
        assert!(store.follows_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_posts_for_user_newest_first_undated_last() {
        let (store, user) = store_with_user().await;
        let followed = store.create_feed("followed", "https://f.example/rss", user.id).await.unwrap();
        let other = store.create_feed("other", "https://o.example/rss", user.id).await.unwrap();
        store.create_follow(user.id, followed.id).await.unwrap();

        let now = Utc::now();
        store.insert_entry(&post_for(followed.id, "https://f.example/old", Some(now - Duration::days(2)))).await.unwrap();
        store.insert_entry(&post_for(followed.id, "https://f.example/undated", None)).await.unwrap();
        store.insert_entry(&post_for(followed.id, "https://f.example/new", Some(now))).await.unwrap();
        store.insert_entry(&post_for(other.id, "https://o.example/new", Some(now))).await.unwrap();

        let posts = store.posts_for_user(user.id, 10).await.unwrap();
        let urls: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://f.example/new", "https://f.example/old", "https://f.example/undated"]
        );

        assert_eq!(store.posts_for_user(user.id, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_cascades() {
        let (store, user) = store_with_user().await;
        let feed = store.create_feed("blog", "https://blog.example/rss", user.id).await.unwrap();
        store.insert_entry(&post_for(feed.id, "https://blog.example/1", None)).await.unwrap();

        store.reset_users().await.unwrap();
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.list_feeds().await.unwrap().is_empty());
        assert!(store.posts().await.is_empty());
    }
}
