//! PostgreSQL store.
//!
//! Schema lives in `migrations/` and is applied by [`PgStore::migrate`].
//! Uniqueness is enforced by indexes; violations come back from the driver
//! as structured database errors and are mapped to
//! [`StoreError::Duplicate`] by [`StoreError::classify`].

use super::{AccountStore, FeedStore};
use crate::error::StoreError;
use crate::models::{Feed, FeedFollow, Post, User};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const FEED_COLUMNS: &str = "id, created_at, updated_at, name, url, user_id, last_fetched_at";
const USER_COLUMNS: &str = "id, created_at, updated_at, name";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[instrument(level = "info", skip_all)]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        info!("Connected to database");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

impl FeedStore for PgStore {
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY last_fetched_at ASC NULLS FIRST LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = $2, updated_at = $2 WHERE id = $1")
                .bind(feed_id)
                .bind(at)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("feed {feed_id}")));
        }
        Ok(())
    }

    async fn insert_entry(&self, post: &Post) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, url, description, published_at, feed_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(post.id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, format!("post {}", post.url)))?;
        Ok(())
    }

    async fn list_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    async fn create_feed(&self, name: &str, url: &str, user_id: Uuid) -> Result<Feed, StoreError> {
        let feed = Feed::new(name, url, user_id);
        sqlx::query_as::<_, Feed>(&format!(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {FEED_COLUMNS}
            "#
        ))
        .bind(feed.id)
        .bind(feed.created_at)
        .bind(feed.updated_at)
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, format!("feed {url}")))
    }

    async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }
}

impl AccountStore for PgStore {
    async fn create_user(&self, name: &str) -> Result<User, StoreError> {
        let user = User::new(name);
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, created_at, updated_at, name)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, format!("user {name}")))
    }

    async fn user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn reset_users(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow, StoreError> {
        let now = Utc::now();
        sqlx::query_as::<_, FeedFollow>(
            r#"
            WITH inserted AS (
                INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
                VALUES ($1, $2, $2, $3, $4)
                RETURNING id, created_at, updated_at, user_id, feed_id
            )
            SELECT inserted.id, inserted.created_at, inserted.updated_at,
                   inserted.user_id, inserted.feed_id,
                   users.name AS user_name, feeds.name AS feed_name
            FROM inserted
            JOIN users ON users.id = inserted.user_id
            JOIN feeds ON feeds.id = inserted.feed_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, format!("follow of feed {feed_id}")))
    }

    async fn follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>, StoreError> {
        let follows = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT ff.id, ff.created_at, ff.updated_at, ff.user_id, ff.feed_id,
                   users.name AS user_name, feeds.name AS feed_name
            FROM feed_follows ff
            JOIN users ON users.id = ff.user_id
            JOIN feeds ON feeds.id = ff.feed_id
            WHERE ff.user_id = $1
            ORDER BY feeds.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    async fn delete_follow(&self, user_id: Uuid, url: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows ff
            USING feeds
            WHERE ff.feed_id = feeds.id AND ff.user_id = $1 AND feeds.url = $2
            "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn posts_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.created_at, p.updated_at, p.title, p.url,
                   p.description, p.published_at, p.feed_id
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY p.published_at DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}
