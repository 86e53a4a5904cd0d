//! Error types shared across the aggregator.
//!
//! Each layer owns one enum:
//! - [`ConfigError`]: startup problems (bad interval, unreadable config file, no user)
//! - [`FeedError`]: fetching or decoding a remote feed document
//! - [`StoreError`]: persistence failures, with duplicates reported structurally
//!
//! Only [`ConfigError`] is meant to stop the process; the other two are
//! logged by the scraper and the cycle moves on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "invalid interval {input:?}: expected a duration such as \"30s\", \"1m\" or \"1h30m\""
    )]
    UnparsableInterval { input: String },

    #[error("interval {input:?} must be greater than zero")]
    NonPositiveInterval { input: String },

    #[error("could not determine the home directory for the config file")]
    NoHomeDir,

    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no user is currently logged in; run `gator login <name>` first")]
    NotLoggedIn,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("could not fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not parse feed document: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (post link, feed URL, user name, follow pair) already exists.
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }

    /// Map a driver error, turning unique-index violations into [`StoreError::Duplicate`].
    pub fn classify(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(what.into())
            }
            _ => StoreError::Database(err),
        }
    }
}
