//! Performance metrics — pure functions over the trade ledger and equity
//! curve.
//!
//! Degenerate inputs (no trades, zero elapsed days, zero variance) resolve
//! to defined zeros, never errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use diplab_core::domain::{ClosedTrade, EquityPoint};

/// Aggregate metrics for one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    /// Total return on initial capital, in percent.
    pub total_return: f64,
    /// Realized PnL in dollars.
    pub total_pnl: f64,
    /// Winning trades / total trades, in percent.
    pub win_rate: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Simple arithmetic annualization of total return, in percent.
    pub annualized_return: f64,
    /// Worst peak-to-trough equity drop, in percent (positive).
    pub max_drawdown: f64,
    /// mean / population-std of per-trade PnL%, scaled by sqrt(252).
    pub sharpe_ratio: f64,
}

impl BacktestMetrics {
    /// Compute all metrics from a completed run.
    ///
    /// Final capital is the last trade's post-exit equity snapshot.
    /// Drawdown comes from the tick-level equity curve — per-trade
    /// snapshots are too coarse to see drawdown inside open positions —
    /// falling back to trade snapshots only when the curve is empty.
    pub fn compute(
        trades: &[ClosedTrade],
        initial_capital: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        equity_curve: &[EquityPoint],
    ) -> Self {
        if trades.is_empty() || initial_capital <= 0.0 {
            return Self::default();
        }

        let final_capital = trades
            .last()
            .map(|t| t.equity_after)
            .unwrap_or(initial_capital);
        let total_pnl = final_capital - initial_capital;
        let total_return = total_pnl / initial_capital * 100.0;

        let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = trades.iter().filter(|t| t.pnl < 0.0).count();
        let total_trades = trades.len();
        let win_rate = winning_trades as f64 / total_trades as f64 * 100.0;

        let days = (end - start).num_days();
        let annualized_return = if days > 0 {
            total_return * 365.25 / days as f64
        } else {
            0.0
        };

        let equities: Vec<f64> = if equity_curve.is_empty() {
            trades.iter().map(|t| t.equity_after).collect()
        } else {
            equity_curve.iter().map(|p| p.equity).collect()
        };
        let max_drawdown = max_drawdown_pct(&equities);

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let sharpe_ratio = sharpe_from_trade_returns(&returns);

        Self {
            total_return,
            total_pnl,
            win_rate,
            total_trades,
            winning_trades,
            losing_trades,
            annualized_return,
            max_drawdown,
            sharpe_ratio,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Worst peak-to-trough drop across an equity series, in percent (positive).
///
/// Always in [0, 100] for positive equity series.
pub fn max_drawdown_pct(equities: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &equity in equities {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst * 100.0
}

/// Sharpe ratio from trade-level PnL percentages, annualized by sqrt(252).
///
/// Trade-level rather than daily sampling, with population deviation —
/// inherited convention, kept so rankings stay comparable with previously
/// stored results. Zero when fewer than two trades or the deviation is zero.
pub fn sharpe_from_trade_returns(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(returns);
    let std = population_std(returns);
    if std <= 0.0 {
        return 0.0;
    }
    mean / std * (252.0_f64).sqrt()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0).
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
