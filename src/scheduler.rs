//! Fixed-interval driver for the scraper.
//!
//! The first cycle runs immediately, then one per elapsed interval. Cycles
//! run inline on the loop's task, so they can never overlap; a cycle that
//! outlasts the interval makes the loop skip the missed ticks instead of
//! bursting to catch up. Shutdown is honoured only between cycles.

use crate::error::ConfigError;
use crate::scraper::Scraper;
use crate::source::FeedSource;
use crate::store::FeedStore;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument};

static DURATION_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$")
        .expect("valid duration syntax regex")
});

static DURATION_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").expect("valid duration part regex")
});

fn unit_seconds(unit: &str) -> f64 {
    match unit {
        "ns" => 1e-9,
        "us" | "µs" | "μs" => 1e-6,
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        _ => unreachable!("unit is constrained by DURATION_PART"),
    }
}

/// Parse a human-readable interval such as `"30s"`, `"1m"`, `"1h30m"` or `"1.5h"`.
///
/// # Errors
///
/// [`ConfigError::UnparsableInterval`] for anything that is not a duration,
/// [`ConfigError::NonPositiveInterval`] for zero or negative durations.
pub fn parse_interval(input: &str) -> Result<Duration, ConfigError> {
    let text = input.trim();
    let non_positive = || ConfigError::NonPositiveInterval {
        input: input.to_string(),
    };
    let unparsable = || ConfigError::UnparsableInterval {
        input: input.to_string(),
    };

    if matches!(text, "0" | "+0" | "-0") {
        return Err(non_positive());
    }
    if !DURATION_SYNTAX.is_match(text) {
        return Err(unparsable());
    }

    let mut seconds = 0.0;
    for part in DURATION_PART.captures_iter(text) {
        let value: f64 = part[1].parse().map_err(|_| unparsable())?;
        seconds += value * unit_seconds(&part[2]);
    }

    if text.starts_with('-') || seconds <= 0.0 {
        return Err(non_positive());
    }
    let duration = Duration::try_from_secs_f64(seconds).map_err(|_| unparsable())?;
    if duration.is_zero() {
        return Err(non_positive());
    }
    Ok(duration)
}

pub struct Scheduler<S, F> {
    scraper: Scraper<S, F>,
    interval: Duration,
}

impl<S, F> Scheduler<S, F>
where
    S: FeedStore,
    F: FeedSource,
{
    /// Validate `interval` and build the scheduler. Nothing runs yet.
    pub fn new(scraper: Scraper<S, F>, interval: &str) -> Result<Self, ConfigError> {
        let interval = parse_interval(interval)?;
        Ok(Self { scraper, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(&self) -> usize {
        self.run_until(shutdown_signal()).await
    }

    /// Run cycles until `shutdown` resolves. Returns the number of cycles run.
    #[instrument(level = "info", skip_all, fields(interval = ?self.interval))]
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> usize {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Collecting feeds every {:?}", self.interval);
        let mut cycles = 0usize;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.scraper.run_cycle().await;
                    cycles += 1;
                }
            }
        }

        info!(cycles, "Stopped collecting feeds");
        cycles
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
