//! Single-run orchestration — snapshot in, RunResult out.

use serde::{Deserialize, Serialize};

use diplab_core::data::MarketSnapshot;
use diplab_core::domain::{ClosedTrade, EquityPoint};
use diplab_core::engine::{run_simulation, SimConfig, SimError, StrategyParams};
use diplab_core::pdt::DayTradeRecord;

use crate::metrics::BacktestMetrics;

/// Marker recorded on placeholder results when the feed had no bars.
pub const NO_DATA_ERROR: &str = "no_price_data";

/// Result of one variation: parameters, ledger, equity curve, metrics.
///
/// Failed or no-data variations keep their slot with zeroed metrics and an
/// error string so grid output stays index-addressable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub variation_index: usize,
    pub params: StrategyParams,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: BacktestMetrics,
    pub error: Option<String>,
}

impl RunResult {
    /// Placeholder for a variation that produced no usable simulation.
    pub fn placeholder(
        variation_index: usize,
        params: StrategyParams,
        error: impl Into<String>,
    ) -> Self {
        Self {
            variation_index,
            params,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            metrics: BacktestMetrics::default(),
            error: Some(error.into()),
        }
    }

    pub fn sharpe(&self) -> f64 {
        self.metrics.sharpe_ratio
    }

    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }
}

/// Run one configuration against a pre-loaded snapshot.
///
/// "No data" degrades to a placeholder rather than an error: sibling grid
/// variations must keep running and every slot must stay addressable.
pub fn run_single_backtest(
    config: &SimConfig,
    snapshot: &MarketSnapshot,
    pdt_bootstrap: &[DayTradeRecord],
    variation_index: usize,
) -> RunResult {
    match run_simulation(config, snapshot, pdt_bootstrap) {
        Ok(output) => {
            let metrics = BacktestMetrics::compute(
                &output.trades,
                config.initial_capital,
                config.start,
                config.end,
                &output.equity_curve,
            );
            RunResult {
                variation_index,
                params: config.params,
                trades: output.trades,
                equity_curve: output.equity_curve,
                metrics,
                error: None,
            }
        }
        Err(SimError::NoData) => {
            RunResult::placeholder(variation_index, config.params, NO_DATA_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use diplab_core::session;

    #[test]
    fn no_data_becomes_a_placeholder() {
        let snapshot = MarketSnapshot::default();
        let config = SimConfig::new(
            vec!["GONE".into()],
            session::range_start(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            session::range_end(NaiveDate::from_ymd_opt(2024, 3, 29).unwrap()),
            10_000.0,
        );
        let result = run_single_backtest(&config, &snapshot, &[], 4);
        assert_eq!(result.variation_index, 4);
        assert!(result.is_placeholder());
        assert_eq!(result.error.as_deref(), Some(NO_DATA_ERROR));
        assert_eq!(result.sharpe(), 0.0);
        assert!(result.trades.is_empty());
    }
}
