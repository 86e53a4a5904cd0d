//! One aggregation cycle.
//!
//! Each call to [`Scraper::run_cycle`] touches exactly one feed:
//!
//! 1. **Select** the feed fetched longest ago (never-fetched first)
//! 2. **Stamp** it as fetched *before* going to the network, so a feed whose
//!    host is down waits a full rotation like everyone else
//! 3. **Fetch** and decode the document
//! 4. **Store** every item, in document order; duplicate links are expected
//!    and skipped, other store failures skip only that item
//! 5. **Report** a summary
//!
//! Nothing in here returns an error: failures are logged and the cycle ends
//! early, leaving the scheduler loop untouched.

use crate::models::Post;
use crate::source::FeedSource;
use crate::store::FeedStore;
use crate::timestamp::normalize_pub_date;
use crate::utils::truncate_for_log;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Per-cycle counters for the items of one feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub found: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No feeds are registered.
    Idle,
    /// Selection, stamping or fetching failed; no items were processed.
    Aborted { feed: Option<String> },
    Completed { feed: String, stats: CycleStats },
}

pub struct Scraper<S, F> {
    store: Arc<S>,
    source: F,
}

impl<S, F> Scraper<S, F>
where
    S: FeedStore,
    F: FeedSource,
{
    pub fn new(store: Arc<S>, source: F) -> Self {
        Self { store, source }
    }

    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let feed = match self.store.next_feed_to_fetch().await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                info!("No feeds registered; nothing to fetch");
                return CycleOutcome::Idle;
            }
            Err(e) => {
                error!(error = %e, "Could not select the next feed to fetch");
                return CycleOutcome::Aborted { feed: None };
            }
        };

        if let Err(e) = self.store.mark_fetched(feed.id, Utc::now()).await {
            error!(feed = %feed.name, feed_id = %feed.id, error = %e, "Could not mark feed as fetched");
            return CycleOutcome::Aborted {
                feed: Some(feed.name),
            };
        }

        let document = match self.source.fetch(&feed.url).await {
            Ok(document) => document,
            Err(e) => {
                warn!(feed = %feed.name, url = %feed.url, error = %e, "Could not collect feed");
                return CycleOutcome::Aborted {
                    feed: Some(feed.name),
                };
            }
        };
        info!(feed = %feed.name, count = document.items.len(), "Found posts in feed");

        let mut stats = CycleStats {
            found: document.items.len(),
            ..Default::default()
        };

        for item in &document.items {
            if item.link.is_empty() {
                warn!(feed = %feed.name, title = %truncate_for_log(&item.title, 80), "Item has no link; skipping");
                stats.skipped += 1;
                continue;
            }

            let published_at = normalize_pub_date(&item.pub_date);
            if published_at.is_none() && !item.pub_date.trim().is_empty() {
                warn!(link = %item.link, pub_date = %item.pub_date, "Could not parse publish date");
            }

            let post = Post::from_item(item, published_at, feed.id);
            match self.store.insert_entry(&post).await {
                Ok(()) => {
                    debug!(link = %post.url, "Stored post");
                    stats.inserted += 1;
                }
                Err(e) if e.is_duplicate() => stats.duplicates += 1,
                Err(e) => {
                    error!(feed = %feed.name, link = %post.url, error = %e, "Could not create post");
                    stats.failed += 1;
                }
            }
        }

        info!(
            feed = %feed.name,
            found = stats.found,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            skipped = stats.skipped,
            failed = stats.failed,
            "Finished scraping feed"
        );
        CycleOutcome::Completed {
            feed: feed.name,
            stats,
        }
    }
}
