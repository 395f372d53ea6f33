//! Bar source seam and structured feed errors.
//!
//! The BarSource trait abstracts over price-data backends (CSV files,
//! synthetic series) so the engine can be fed and mocked without a network
//! dependency. An empty bar vector means "no data for this symbol/range",
//! never a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Bar interval for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "60m")]
    Hour1,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "1m")]
    Min1,
}

impl Interval {
    /// Bars per trading day over the extended 04:00-20:00 session.
    ///
    /// Daily data is one bar per session by definition.
    pub fn bars_per_day(self) -> usize {
        match self {
            Interval::Day => 1,
            Interval::Hour1 => 16,
            Interval::Min30 => 32,
            Interval::Min15 => 64,
            Interval::Min5 => 192,
            Interval::Min1 => 960,
        }
    }

    /// Rolling-high lookback in bars: roughly 20 trading sessions.
    pub fn lookback_bars(self) -> usize {
        20 * self.bars_per_day()
    }
}

/// Structured error types for bar feeds.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row in {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("feed error: {0}")]
    Other(String),
}

/// Trait for bar feeds.
///
/// Implementations return bars sorted ascending by timestamp, covering
/// `[start, end]` inclusive. An empty vector signals "no data" and must not
/// be treated as a failure — delisted or unknown symbols are expected input.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch bars for one symbol over a UTC instant range.
    fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Bar>, FeedError>;
}
