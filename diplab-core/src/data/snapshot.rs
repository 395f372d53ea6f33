//! Read-only market snapshot shared across simulation runs.
//!
//! Bars are fetched once per symbol (with the lookback buffer) before any
//! simulation starts; every grid variation then borrows the same immutable
//! snapshot. Nothing mutates a snapshot after `load_snapshot` returns.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};

use crate::domain::Bar;

use super::source::{BarSource, FeedError, Interval};

/// Calendar-day lookback buffer ahead of the run start, daily interval.
const DAILY_BUFFER_DAYS: i64 = 40;
/// Calendar-day lookback buffer, intraday intervals.
const INTRADAY_BUFFER_DAYS: i64 = 60;
/// Buffer for the 5-minute fine-bar series used by intraday exits.
const FINE_BAR_BUFFER_DAYS: i64 = 5;

/// All bars a run needs, fetched once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    /// Primary series at the configured interval, sorted by timestamp,
    /// including the lookback buffer before the run's start.
    pub bars: BTreeMap<String, Vec<Bar>>,
    /// 5-minute bars for intraday exit precision (empty unless enabled).
    pub intraday: BTreeMap<String, Vec<Bar>>,
}

impl MarketSnapshot {
    /// True when no symbol has any primary bar.
    pub fn is_empty(&self) -> bool {
        self.bars.values().all(|bars| bars.is_empty())
    }

    /// Sorted union of all primary-bar timestamps inside `[start, end]`.
    pub fn union_timestamps(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let mut set = BTreeSet::new();
        for bars in self.bars.values() {
            for bar in bars {
                if bar.ts >= start && bar.ts <= end {
                    set.insert(bar.ts);
                }
            }
        }
        set.into_iter().collect()
    }
}

/// Fetch everything a run needs, once.
///
/// Primary bars are fetched from `start - buffer` so the rolling high has
/// history on the first processed tick; 5-minute fine bars are fetched when
/// `intraday_exit` is set on a daily run. A symbol that errors degrades to
/// "no data" unless every symbol errors, in which case the first error
/// surfaces — that is the only way a snapshot load fails.
pub fn load_snapshot(
    source: &dyn BarSource,
    symbols: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Interval,
    intraday_exit: bool,
) -> Result<MarketSnapshot, FeedError> {
    let buffer = if interval == Interval::Day {
        DAILY_BUFFER_DAYS
    } else {
        INTRADAY_BUFFER_DAYS
    };
    let data_start = start - Duration::days(buffer);

    let mut snapshot = MarketSnapshot::default();
    let mut first_err: Option<FeedError> = None;
    let mut fetched_any = false;
    for symbol in symbols {
        match source.fetch(symbol, data_start, end, interval) {
            Ok(bars) => {
                fetched_any = true;
                if !bars.is_empty() {
                    snapshot.bars.insert(symbol.clone(), bars);
                }
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    if !fetched_any {
        if let Some(err) = first_err {
            return Err(err);
        }
    }

    if intraday_exit && interval == Interval::Day {
        let fine_start = start - Duration::days(FINE_BAR_BUFFER_DAYS);
        for symbol in symbols {
            // Fine-bar failures are non-fatal; the coarse exit path still works.
            if let Ok(bars) = source.fetch(symbol, fine_start, end, Interval::Min5) {
                if !bars.is_empty() {
                    snapshot.intraday.insert(symbol.clone(), bars);
                }
            }
        }
    }

    Ok(snapshot)
}
