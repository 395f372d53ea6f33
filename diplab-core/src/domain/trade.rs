//! ClosedTrade and EquityPoint — the ledger and the equity curve.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade direction.
///
/// The dip engine only opens long positions; the field keeps ledgers
/// self-describing when stored next to other strategies' output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
}

/// A completed round-trip trade. Immutable once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub shares: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub target_price: f64,
    pub stop_price: f64,
    pub hit_target: bool,
    pub hit_stop: bool,
    /// Realized PnL in dollars, net of fees.
    pub pnl: f64,
    /// Price move from entry to exit as a percentage of entry.
    pub pnl_pct: f64,
    /// Total account equity (cash + open positions) just after this exit.
    pub equity_after: f64,
    /// Dip from the rolling high that triggered the entry, in percent.
    pub dip_pct: f64,
    pub taf_fee: f64,
    pub cat_fee: f64,
    pub total_fees: f64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Holding period in whole days.
    pub fn days_held(&self) -> i64 {
        (self.exit_time - self.entry_time).num_days()
    }
}

/// One point of the equity curve: total account value at a timestamp.
///
/// Recorded at every processed timestamp, not just at trade closes —
/// drawdown inside a still-open position is invisible to the trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: DateTime<Utc>,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> ClosedTrade {
        ClosedTrade {
            entry_time: Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap(),
            exit_time: Utc.with_ymd_and_hms(2024, 3, 5, 21, 0, 0).unwrap(),
            symbol: "AAPL".into(),
            direction: Direction::Long,
            shares: 11,
            entry_price: 90.0,
            exit_price: 90.9,
            target_price: 90.9,
            stop_price: 89.55,
            hit_target: true,
            hit_stop: false,
            pnl: 9.89,
            pnl_pct: 1.0,
            equity_after: 10_009.89,
            dip_pct: 10.0,
            taf_fee: 0.01,
            cat_fee: 0.000583,
            total_fees: 0.010583,
        }
    }

    #[test]
    fn winner_detection() {
        assert!(sample_trade().is_winner());
        let mut loser = sample_trade();
        loser.pnl = -5.0;
        assert!(!loser.is_winner());
    }

    #[test]
    fn exit_never_precedes_entry() {
        let trade = sample_trade();
        assert!(trade.exit_time >= trade.entry_time);
        assert_eq!(trade.days_held(), 1);
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deser: ClosedTrade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
