//! # gator
//!
//! An RSS aggregator: register feeds, let the aggregation worker pull them
//! into PostgreSQL on a fixed schedule, and browse the newest posts from
//! the feeds you follow.
//!
//! ## Usage
//!
//! ```sh
//! gator register alice
//! gator addfeed "Hacker News" https://news.ycombinator.com/rss
//! gator agg 1m          # runs until Ctrl+C
//! gator browse 5
//! ```
//!
//! ## Architecture
//!
//! The aggregation worker (`agg`) is a loop of single-feed cycles:
//! 1. **Scheduling**: [`scheduler::Scheduler`] ticks at a fixed interval
//! 2. **Selection**: the feed fetched longest ago is picked and stamped
//! 3. **Fetching**: [`source::HttpFeedSource`] downloads and decodes the RSS document
//! 4. **Storing**: [`scraper::Scraper`] normalizes dates and inserts new posts,
//!    skipping links that are already stored
//!
//! Every other subcommand is a short request against the store.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod commands;
mod config;
mod context;
mod error;
mod models;
mod scheduler;
mod scraper;
mod source;
mod store;
mod timestamp;
mod utils;

use cli::Cli;
use config::ConfigFile;
use context::AppContext;
use store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    let config = ConfigFile::load(args.config.as_deref()).await?;
    let database_url = args
        .database_url
        .clone()
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| config.config.db_url.clone());
    if database_url.is_empty() {
        error!(path = %config.path().display(), "No database URL configured");
        return Err(format!(
            "no database URL: set db_url in {} or pass --database-url",
            config.path().display()
        )
        .into());
    }

    let store = Arc::new(PgStore::connect(&database_url).await?);
    store.migrate().await?;
    info!("Database schema is up to date");

    let mut ctx = AppContext::new(store, config);
    commands::run(&mut ctx, args.command).await?;

    Ok(())
}
