//! PDT governor — rolling 5-business-day day-trade window.
//!
//! FINRA limits accounts under $25k equity to 3 same-day round trips per
//! rolling 5-business-day window. The tracker is conservative: it blocks
//! the would-be 4th trade instead of detecting a violation after the fact.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Account equity threshold above which the PDT rule no longer applies.
pub const PDT_EQUITY_MIN: f64 = 25_000.0;

/// Maximum day trades permitted inside the rolling window.
pub const MAX_DAY_TRADES: usize = 3;

/// One recorded same-day round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
}

/// Tracks day trades and answers whether a new one is permitted.
///
/// State is an append-only record list; records are never deleted. The
/// tracker lives for one simulation run and is then discarded.
#[derive(Debug, Clone, Default)]
pub struct PdtTracker {
    day_trades: Vec<DayTradeRecord>,
}

impl PdtTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the tracker with day trades from a prior session so the rolling
    /// lookback sees them.
    pub fn bootstrap(records: &[DayTradeRecord]) -> Self {
        Self {
            day_trades: records.to_vec(),
        }
    }

    /// The date `n` business days (Mon-Fri) before `from`.
    fn business_days_back(from: NaiveDate, n: usize) -> NaiveDate {
        let mut current = from;
        let mut counted = 0;
        while counted < n {
            current -= Duration::days(1);
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                counted += 1;
            }
        }
        current
    }

    /// Day trades in the window `(date - 5 business days, date]`.
    pub fn day_trade_count(&self, date: NaiveDate) -> usize {
        let window_start = Self::business_days_back(date, 5);
        self.day_trades
            .iter()
            .filter(|dt| dt.date > window_start && dt.date <= date)
            .count()
    }

    /// Whether a new day trade on `date` stays under the limit.
    pub fn can_day_trade(&self, date: NaiveDate) -> bool {
        self.day_trade_count(date) < MAX_DAY_TRADES
    }

    /// Record a same-day round trip.
    ///
    /// Appends unconditionally — the caller decides whether a round trip
    /// actually happened.
    pub fn record_day_trade(&mut self, date: NaiveDate, symbol: &str) {
        self.day_trades.push(DayTradeRecord {
            date,
            symbol: symbol.to_string(),
        });
    }

    pub fn records(&self) -> &[DayTradeRecord] {
        &self.day_trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_tracker_permits_day_trades() {
        let tracker = PdtTracker::new();
        assert!(tracker.can_day_trade(date(2024, 3, 8)));
        assert_eq!(tracker.day_trade_count(date(2024, 3, 8)), 0);
    }

    #[test]
    fn three_trades_block_the_fourth() {
        let mut tracker = PdtTracker::new();
        // Mon, Tue, Wed of the same week
        tracker.record_day_trade(date(2024, 3, 4), "AAPL");
        tracker.record_day_trade(date(2024, 3, 5), "MSFT");
        tracker.record_day_trade(date(2024, 3, 6), "AAPL");

        assert_eq!(tracker.day_trade_count(date(2024, 3, 6)), 3);
        assert!(!tracker.can_day_trade(date(2024, 3, 6)));
        // Still blocked through Friday of the same week
        assert!(!tracker.can_day_trade(date(2024, 3, 8)));
    }

    #[test]
    fn window_clears_on_the_sixth_business_day() {
        let mut tracker = PdtTracker::new();
        tracker.record_day_trade(date(2024, 3, 4), "AAPL"); // Mon
        tracker.record_day_trade(date(2024, 3, 5), "AAPL"); // Tue
        tracker.record_day_trade(date(2024, 3, 6), "AAPL"); // Wed

        // Next Monday is the 6th business day: the Mon 3/4 record has
        // rolled out of the window, leaving 2 of 3.
        assert_eq!(tracker.day_trade_count(date(2024, 3, 11)), 2);
        assert!(tracker.can_day_trade(date(2024, 3, 11)));
    }

    #[test]
    fn window_skips_weekends() {
        let mut tracker = PdtTracker::new();
        // Friday trade still counts the following Thursday (4 business days later)
        tracker.record_day_trade(date(2024, 3, 1), "AAPL"); // Fri
        assert_eq!(tracker.day_trade_count(date(2024, 3, 7)), 1); // Thu
        // But not the following Friday (5 business days later, window start = 3/1)
        assert_eq!(tracker.day_trade_count(date(2024, 3, 8)), 0);
    }

    #[test]
    fn bootstrap_counts_prior_session_trades() {
        let records = vec![
            DayTradeRecord {
                date: date(2024, 3, 4),
                symbol: "AAPL".into(),
            },
            DayTradeRecord {
                date: date(2024, 3, 5),
                symbol: "TSLA".into(),
            },
            DayTradeRecord {
                date: date(2024, 3, 6),
                symbol: "NVDA".into(),
            },
        ];
        let tracker = PdtTracker::bootstrap(&records);
        assert!(!tracker.can_day_trade(date(2024, 3, 7)));
        assert_eq!(tracker.records().len(), 3);
    }

    #[test]
    fn record_appends_unconditionally() {
        let mut tracker = PdtTracker::new();
        for _ in 0..5 {
            tracker.record_day_trade(date(2024, 3, 4), "AAPL");
        }
        // The tracker does not enforce at record time, only at query time.
        assert_eq!(tracker.records().len(), 5);
        assert!(!tracker.can_day_trade(date(2024, 3, 4)));
    }
}
