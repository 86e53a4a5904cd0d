//! Feed sources: fetching and decoding syndication documents.
//!
//! A [`FeedSource`] turns a registered feed URL into a [`RawFeed`]. The
//! production implementation is [`HttpFeedSource`], which performs one HTTP
//! GET per call and decodes the body as RSS 2.0 via [`rss::parse_document`].
//!
//! Sources hold no state between calls; every call either returns the whole
//! document or a [`FeedError`].

pub mod http;
pub mod rss;

use crate::error::FeedError;
use crate::models::RawFeed;

pub use http::HttpFeedSource;

/// Anything that can produce a parsed feed document for a URL.
pub trait FeedSource {
    /// Fetch and decode the document published at `url`.
    async fn fetch(&self, url: &str) -> Result<RawFeed, FeedError>;
}
