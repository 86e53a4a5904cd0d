//! Command handlers.
//!
//! Handlers that act on behalf of a user resolve the logged-in user first
//! and fail with a config error when nobody is logged in.

use crate::cli::Command;
use crate::context::AppContext;
use crate::models::{Feed, Post};
use crate::scheduler::Scheduler;
use crate::scraper::Scraper;
use crate::source::HttpFeedSource;
use crate::store::{AccountStore, FeedStore};
use crate::utils::squash_whitespace;
use anyhow::{Context, Result, bail};
use tracing::{info, instrument};
use url::Url;

/// Dispatch one parsed command.
pub async fn run<S>(ctx: &mut AppContext<S>, command: Command) -> Result<()>
where
    S: FeedStore + AccountStore,
{
    match command {
        Command::Register { name } => register(ctx, &name).await,
        Command::Login { name } => login(ctx, &name).await,
        Command::Users => users(ctx).await,
        Command::Reset => reset(ctx).await,
        Command::AddFeed { name, url } => add_feed(ctx, &name, &url).await.map(|_| ()),
        Command::Feeds => feeds(ctx).await,
        Command::Follow { url } => follow(ctx, &url).await,
        Command::Following => following(ctx).await,
        Command::Unfollow { url } => unfollow(ctx, &url).await,
        Command::Browse { limit } => browse(ctx, limit).await.map(|_| ()),
        Command::Agg { time_between_reqs } => aggregate(ctx, &time_between_reqs).await,
    }
}

#[instrument(level = "info", skip(ctx))]
async fn register<S: AccountStore>(ctx: &mut AppContext<S>, name: &str) -> Result<()> {
    let user = match ctx.store.create_user(name).await {
        Ok(user) => user,
        Err(e) if e.is_duplicate() => bail!("user {name} already exists"),
        Err(e) => return Err(e).context("could not create user"),
    };
    ctx.config
        .set_user(&user.name)
        .await
        .context("could not set current user")?;

    info!(user_id = %user.id, "Registered user");
    println!("User {} was created successfully!", user.name);
    Ok(())
}

#[instrument(level = "info", skip(ctx))]
async fn login<S: AccountStore>(ctx: &mut AppContext<S>, name: &str) -> Result<()> {
    let user = ctx
        .store
        .user_by_name(name)
        .await
        .context("could not look up user")?;
    if user.is_none() {
        bail!("user {name} does not exist");
    }
    ctx.config
        .set_user(name)
        .await
        .context("could not set current user")?;

    println!("User has been set to: {name}");
    Ok(())
}

async fn users<S: AccountStore>(ctx: &AppContext<S>) -> Result<()> {
    let users = ctx.store.list_users().await.context("could not get users")?;
    let current = ctx.config.config.current_user();
    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

async fn reset<S: AccountStore>(ctx: &AppContext<S>) -> Result<()> {
    ctx.store.reset_users().await.context("could not reset users")?;
    info!("Reset all users");
    println!("All users have been deleted from the database.");
    Ok(())
}

#[instrument(level = "info", skip(ctx))]
async fn add_feed<S>(ctx: &AppContext<S>, name: &str, url: &str) -> Result<Feed>
where
    S: FeedStore + AccountStore,
{
    let user = ctx.current_user().await?;
    let parsed = Url::parse(url).with_context(|| format!("{url} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("feed URL must use http or https, got {}", parsed.scheme());
    }

    let feed = match ctx.store.create_feed(name, url, user.id).await {
        Ok(feed) => feed,
        Err(e) if e.is_duplicate() => bail!("a feed with URL {url} is already registered"),
        Err(e) => return Err(e).context("could not create feed"),
    };
    ctx.store
        .create_follow(user.id, feed.id)
        .await
        .context("could not create feed follow")?;

    info!(feed_id = %feed.id, "Registered feed");
    println!("Feed created successfully:");
    print_feed(&feed, &user.name);
    Ok(feed)
}

async fn feeds<S>(ctx: &AppContext<S>) -> Result<()>
where
    S: FeedStore + AccountStore,
{
    let feeds = ctx.store.list_feeds().await.context("could not get feeds")?;
    if feeds.is_empty() {
        println!("No feeds found in the database.");
        return Ok(());
    }

    println!("Found {} feeds:", feeds.len());
    for feed in feeds {
        let owner = ctx
            .store
            .user_by_id(feed.user_id)
            .await
            .context("could not look up feed owner")?
            .map(|u| u.name)
            .unwrap_or_else(|| "unknown".to_string());
        print_feed(&feed, &owner);
        println!("--------------------");
    }
    Ok(())
}

#[instrument(level = "info", skip(ctx))]
async fn follow<S>(ctx: &AppContext<S>, url: &str) -> Result<()>
where
    S: FeedStore + AccountStore,
{
    let user = ctx.current_user().await?;
    let Some(feed) = ctx
        .store
        .feed_by_url(url)
        .await
        .context("could not look up feed")?
    else {
        bail!("could not find a feed with URL {url}; add it with `gator addfeed`");
    };

    let follow = match ctx.store.create_follow(user.id, feed.id).await {
        Ok(follow) => follow,
        Err(e) if e.is_duplicate() => bail!("{} already follows {}", user.name, feed.name),
        Err(e) => return Err(e).context("could not follow feed"),
    };
    println!(
        "User {} is now following feed: {}",
        follow.user_name, follow.feed_name
    );
    Ok(())
}

async fn following<S: AccountStore>(ctx: &AppContext<S>) -> Result<()> {
    let user = ctx.current_user().await?;
    let follows = ctx
        .store
        .follows_for_user(user.id)
        .await
        .with_context(|| format!("could not get follows for {}", user.name))?;

    if follows.is_empty() {
        println!("You aren't following any feeds yet.");
        return Ok(());
    }
    println!("Feeds followed by {}:", user.name);
    for follow in follows {
        println!("* {}", follow.feed_name);
    }
    Ok(())
}

#[instrument(level = "info", skip(ctx))]
async fn unfollow<S: AccountStore>(ctx: &AppContext<S>, url: &str) -> Result<()> {
    let user = ctx.current_user().await?;
    let removed = ctx
        .store
        .delete_follow(user.id, url)
        .await
        .context("could not unfollow feed")?;

    if removed {
        println!("Successfully unfollowed {url} for user {}", user.name);
    } else {
        println!("You weren't following the feed at {url}");
    }
    Ok(())
}

async fn browse<S: AccountStore>(ctx: &AppContext<S>, limit: u32) -> Result<Vec<Post>> {
    let user = ctx.current_user().await?;
    let posts = ctx
        .store
        .posts_for_user(user.id, limit)
        .await
        .context("could not get posts")?;

    println!("Found {} posts for user {}:", posts.len(), user.name);
    for post in &posts {
        println!("{}", render_post(post));
    }
    Ok(posts)
}

async fn aggregate<S: FeedStore>(ctx: &AppContext<S>, time_between_reqs: &str) -> Result<()> {
    let source = HttpFeedSource::new().context("could not set up the feed client")?;
    let scraper = Scraper::new(ctx.store.clone(), source);
    let scheduler = Scheduler::new(scraper, time_between_reqs)?;

    println!("Collecting feeds every {:?}", scheduler.interval());
    scheduler.run().await;
    Ok(())
}

fn print_feed(feed: &Feed, owner: &str) {
    println!("{}", render_feed(feed, owner));
}

fn render_feed(feed: &Feed, owner: &str) -> String {
    format!(
        "* ID:         {}\n\
         * Created:    {}\n\
         * Updated:    {}\n\
         * Name:       {}\n\
         * URL:        {}\n\
         * User ID:    {}\n\
         * Created By: {owner}",
        feed.id, feed.created_at, feed.updated_at, feed.name, feed.url, feed.user_id
    )
}

fn render_post(post: &Post) -> String {
    let date = post
        .published_at
        .map(|d| d.format("%a %b %e").to_string())
        .unwrap_or_else(|| "undated".to_string());
    let description = post
        .description
        .as_deref()
        .map(squash_whitespace)
        .unwrap_or_default();
    format!(
        "{date} from {}\n--- {} ---\nDescription: {description}\n",
        post.title, post.url
    )
}
