//! CSV export of trade ledgers.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use diplab_core::domain::{ClosedTrade, Direction};
use diplab_core::session::TRADING_TZ;

/// Write one ledger to `path` as CSV, timestamps rendered in exchange time.
pub fn write_trades_csv(path: &Path, trades: &[ClosedTrade]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "entry_time",
        "exit_time",
        "symbol",
        "direction",
        "shares",
        "entry_price",
        "exit_price",
        "target_price",
        "stop_price",
        "hit_target",
        "hit_stop",
        "pnl",
        "pnl_pct",
        "equity_after",
        "dip_pct",
        "taf_fee",
        "cat_fee",
        "total_fees",
    ])?;

    for trade in trades {
        writer.write_record([
            format_et(trade.entry_time),
            format_et(trade.exit_time),
            trade.symbol.clone(),
            direction_label(trade.direction).to_string(),
            trade.shares.to_string(),
            format!("{:.4}", trade.entry_price),
            format!("{:.4}", trade.exit_price),
            format!("{:.4}", trade.target_price),
            format!("{:.4}", trade.stop_price),
            trade.hit_target.to_string(),
            trade.hit_stop.to_string(),
            format!("{:.4}", trade.pnl),
            format!("{:.4}", trade.pnl_pct),
            format!("{:.2}", trade.equity_after),
            format!("{:.4}", trade.dip_pct),
            format!("{:.4}", trade.taf_fee),
            format!("{:.6}", trade.cat_fee),
            format!("{:.6}", trade.total_fees),
        ])?;
    }

    writer.flush().context("flushing trades csv")?;
    Ok(())
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "long",
    }
}

fn format_et(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&TRADING_TZ)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
