//! Parameter grid enumeration and the parallel grid search.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use diplab_core::data::MarketSnapshot;
use diplab_core::engine::{SimConfig, StrategyParams};
use diplab_core::pdt::DayTradeRecord;

use crate::runner::{run_single_backtest, RunResult};

/// Errors from the sweep as a whole. Individual variations never error —
/// they become index-stable placeholders.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("no price data for any symbol — nothing to sweep")]
    EmptySnapshot,
}

/// The five parameter lists whose Cartesian product defines the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub dip_thresholds: Vec<f64>,
    pub take_profits: Vec<f64>,
    pub hold_days: Vec<i64>,
    pub stop_losses: Vec<f64>,
    pub position_sizes: Vec<f64>,
}

impl Default for ParamGrid {
    /// The standard sweep: 3 dip levels x 2 targets x 3 hold windows.
    fn default() -> Self {
        Self {
            dip_thresholds: vec![0.03, 0.05, 0.07],
            take_profits: vec![0.01, 0.015],
            hold_days: vec![1, 2, 3],
            stop_losses: vec![0.005],
            position_sizes: vec![0.10],
        }
    }
}

impl ParamGrid {
    /// A one-combination grid from fixed parameters.
    pub fn single(params: StrategyParams) -> Self {
        Self {
            dip_thresholds: vec![params.dip_threshold],
            take_profits: vec![params.take_profit],
            hold_days: vec![params.hold_days],
            stop_losses: vec![params.stop_loss],
            position_sizes: vec![params.position_size],
        }
    }

    /// Total number of combinations.
    pub fn size(&self) -> usize {
        self.dip_thresholds.len()
            * self.take_profits.len()
            * self.hold_days.len()
            * self.stop_losses.len()
            * self.position_sizes.len()
    }

    /// Enumerate every combination, outermost dip_threshold to innermost
    /// position_size. This order is the index order of sweep results.
    pub fn enumerate(&self) -> Vec<StrategyParams> {
        let mut combos = Vec::with_capacity(self.size());
        for &dip_threshold in &self.dip_thresholds {
            for &take_profit in &self.take_profits {
                for &hold_days in &self.hold_days {
                    for &stop_loss in &self.stop_losses {
                        for &position_size in &self.position_sizes {
                            combos.push(StrategyParams {
                                dip_threshold,
                                take_profit,
                                hold_days,
                                stop_loss,
                                position_size,
                            });
                        }
                    }
                }
            }
        }
        combos
    }
}

/// Outcome of a sweep: index-stable results plus the best slot by Sharpe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// One result per grid combination, in enumeration order.
    pub results: Vec<RunResult>,
    /// Index of the first arg-max by Sharpe ratio (None for an empty grid).
    pub best_index: Option<usize>,
}

impl SweepOutcome {
    fn new(results: Vec<RunResult>) -> Self {
        // First arg-max: ties go to the earliest enumerated combination.
        let mut best_index = None;
        let mut best_sharpe = f64::NEG_INFINITY;
        for (index, result) in results.iter().enumerate() {
            if result.sharpe() > best_sharpe {
                best_sharpe = result.sharpe();
                best_index = Some(index);
            }
        }
        Self {
            results,
            best_index,
        }
    }

    pub fn best(&self) -> Option<&RunResult> {
        self.best_index.map(|index| &self.results[index])
    }
}

/// Grid search executor.
///
/// Variations are embarrassingly parallel: each gets its own cash balance,
/// position map, and PDT governor, and shares only the read-only snapshot.
/// Results land in index-addressed slots, so output order is the
/// enumeration order regardless of which worker finishes first.
pub struct GridSearch {
    grid: ParamGrid,
    parallel: bool,
}

impl GridSearch {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            parallel: true,
        }
    }

    /// Enable or disable rayon execution (sequential runs are handy when
    /// bisecting a misbehaving variation).
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every combination against the shared snapshot.
    pub fn sweep(
        &self,
        base: &SimConfig,
        snapshot: &MarketSnapshot,
        pdt_bootstrap: &[DayTradeRecord],
    ) -> Result<SweepOutcome, SweepError> {
        self.sweep_with_progress(base, snapshot, pdt_bootstrap, |_, _, _| {})
    }

    /// Sweep with a progress callback invoked as each variation completes
    /// (completion order under rayon, not index order).
    pub fn sweep_with_progress<F>(
        &self,
        base: &SimConfig,
        snapshot: &MarketSnapshot,
        pdt_bootstrap: &[DayTradeRecord],
        progress: F,
    ) -> Result<SweepOutcome, SweepError>
    where
        F: Fn(usize, usize, &RunResult) + Send + Sync,
    {
        if snapshot.is_empty() {
            return Err(SweepError::EmptySnapshot);
        }
        let combos = self.grid.enumerate();
        let total = combos.len();

        let run_one = |(index, params): (usize, StrategyParams)| -> RunResult {
            let mut config = base.clone();
            config.params = params;
            // A panicking variation is isolated into a placeholder instead
            // of poisoning its siblings.
            let result = catch_unwind(AssertUnwindSafe(|| {
                run_single_backtest(&config, snapshot, pdt_bootstrap, index)
            }))
            .unwrap_or_else(|panic| {
                RunResult::placeholder(index, params, panic_message(panic))
            });
            progress(index, total, &result);
            result
        };

        let results: Vec<RunResult> = if self.parallel {
            combos.into_par_iter().enumerate().map(run_one).collect()
        } else {
            combos.into_iter().enumerate().map(run_one).collect()
        };

        Ok(SweepOutcome::new(results))
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic: unknown".to_string()
    }
}
