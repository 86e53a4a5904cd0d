//! Command-line interface definitions for gator.
//!
//! Every subcommand is a variant of [`Command`] and is dispatched with a
//! single `match` in [`crate::commands::run`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for gator.
///
/// # Examples
///
/// ```sh
/// gator register alice
/// gator addfeed "Hacker News" https://news.ycombinator.com/rss
/// gator agg 1m
/// gator browse 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (defaults to ~/.gatorconfig.json)
    #[arg(short, long, env = "GATOR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Database URL; overrides `db_url` from the config file
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },

    /// Log in as an existing user
    Login { name: String },

    /// List all users
    Users,

    /// Delete every user, feed, follow and post
    Reset,

    /// Register a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },

    /// List all registered feeds
    Feeds,

    /// Follow an already registered feed
    Follow { url: String },

    /// List the feeds the current user follows
    Following,

    /// Stop following a feed
    Unfollow { url: String },

    /// Show the latest posts from followed feeds
    Browse {
        #[arg(default_value_t = 2)]
        limit: u32,
    },

    /// Fetch feeds forever, one feed per interval (e.g. "30s", "1m", "1h")
    Agg {
        #[arg(allow_hyphen_values = true)]
        time_between_reqs: String,
    },
}
