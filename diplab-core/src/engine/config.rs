//! Run configuration — strategy parameters and simulation settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Interval;
use crate::pdt::PDT_EQUITY_MIN;

/// The five dip-strategy parameters swept by the grid search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Fractional drop from the rolling high that triggers an entry (0.05 = 5%).
    pub dip_threshold: f64,
    /// Fractional gain from entry at which the target sits (0.01 = 1%).
    pub take_profit: f64,
    /// Calendar days before the time-based exit fires.
    pub hold_days: i64,
    /// Fractional loss from entry at which the stop sits (0.005 = 0.5%).
    pub stop_loss: f64,
    /// Fraction of available cash committed per entry.
    pub position_size: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            dip_threshold: 0.05,
            take_profit: 0.01,
            hold_days: 2,
            stop_loss: 0.005,
            position_size: 0.10,
        }
    }
}

/// Full configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub symbols: Vec<String>,
    /// First instant processed (inclusive).
    pub start: DateTime<Utc>,
    /// Last instant processed (inclusive).
    pub end: DateTime<Utc>,
    pub initial_capital: f64,
    pub params: StrategyParams,
    pub interval: Interval,
    /// Allow entries during the 04:00-20:00 ET extended session.
    pub extended_hours: bool,
    /// Use 5-minute bars to resolve which of stop/target hit first.
    pub intraday_exit: bool,
    /// Override PDT enforcement; None applies the under-$25k default.
    pub pdt_protection: Option<bool>,
}

impl SimConfig {
    pub fn new(
        symbols: Vec<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        initial_capital: f64,
    ) -> Self {
        Self {
            symbols,
            start,
            end,
            initial_capital,
            params: StrategyParams::default(),
            interval: Interval::Day,
            extended_hours: false,
            intraday_exit: false,
            pdt_protection: None,
        }
    }

    pub fn with_params(mut self, params: StrategyParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// PDT enforcement for this run: the explicit override if set, else on
    /// for accounts under the $25k equity threshold.
    pub fn pdt_enforced(&self) -> bool {
        self.pdt_protection
            .unwrap_or(self.initial_capital < PDT_EQUITY_MIN)
    }
}
