//! CSV-backed bar source — one `SYMBOL.csv` per symbol in a directory.
//!
//! Expected header: `ts,open,high,low,close,volume` with RFC 3339
//! timestamps. Daily files live directly in the directory; intraday files
//! live in a per-interval subdirectory (`5min/AAPL.csv`). A missing file is
//! "no data", not an error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::Bar;

use super::source::{BarSource, FeedError, Interval};

/// Bar source reading per-symbol CSV files from a directory.
pub struct CsvSource {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    ts: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        match subdir(interval) {
            Some(sub) => self.dir.join(sub).join(format!("{symbol}.csv")),
            None => self.dir.join(format!("{symbol}.csv")),
        }
    }
}

/// Per-interval subdirectory for intraday files.
fn subdir(interval: Interval) -> Option<&'static str> {
    match interval {
        Interval::Day => None,
        Interval::Hour1 => Some("60min"),
        Interval::Min30 => Some("30min"),
        Interval::Min15 => Some("15min"),
        Interval::Min5 => Some("5min"),
        Interval::Min1 => Some("1min"),
    }
}

impl BarSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Bar>, FeedError> {
        let path = self.path_for(symbol, interval);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_bars(&path, symbol, start, end)
    }
}

fn read_bars(
    path: &Path,
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Bar>, FeedError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        let reason = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(io) => FeedError::Io {
                path: path.display().to_string(),
                source: io,
            },
            _ => FeedError::Malformed {
                path: path.display().to_string(),
                reason,
            },
        }
    })?;

    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| FeedError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if row.ts < start || row.ts > end {
            continue;
        }
        bars.push(Bar {
            symbol: symbol.to_string(),
            ts: row.ts,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    bars.sort_by_key(|b| b.ts);
    Ok(bars)
}
