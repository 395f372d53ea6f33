//! OpenPosition — an in-flight long position for one symbol.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A live position between entry and exit.
///
/// At most one exists per symbol at any time. The simulator owns them in a
/// map keyed by symbol and destroys each when its exit is recorded; they are
/// never shared across symbols or runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    /// Entry instant as it will appear in the ledger.
    pub entry_ts: DateTime<Utc>,
    /// Exchange-calendar date of entry, for same-day round-trip detection.
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: i64,
    /// entry_price * (1 + take_profit).
    pub target_price: f64,
    /// entry_price * (1 - stop_loss).
    pub stop_price: f64,
    /// First instant at which the time-based exit fires.
    pub max_exit_ts: DateTime<Utc>,
    /// Dip fraction that triggered the entry.
    pub dip_pct: f64,
}

impl OpenPosition {
    /// Cost basis debited from cash at entry.
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.shares as f64
    }

    /// Mark-to-market value at the given price.
    pub fn market_value(&self, price: f64) -> f64 {
        price * self.shares as f64
    }
}
