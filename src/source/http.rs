//! HTTP-backed feed source.

use super::{FeedSource, rss};
use crate::error::FeedError;
use crate::models::RawFeed;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{info, instrument};

/// Client identifier sent with every feed request.
pub const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

/// Total deadline for one feed request, body included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches feeds with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new() -> Result<Self, FeedError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FeedError::Client)?;
        Ok(Self { client })
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<RawFeed, FeedError> {
        let fetch_error = |source| FeedError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FeedError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(fetch_error)?;
        let feed = rss::parse_document(&body)?;

        info!(title = %feed.title, link = %feed.link, items = feed.items.len(), "Fetched feed");
        Ok(feed)
    }
}
