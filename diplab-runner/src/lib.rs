//! DipLab Runner — metrics, grid search, run requests, export.
//!
//! Builds on `diplab-core` to provide:
//! - Performance metrics over a completed ledger and equity curve
//! - Single-run orchestration (snapshot -> simulator -> metrics)
//! - Rayon-parallel grid search with index-stable results
//! - Serializable run requests with content-addressed run ids
//! - CSV trade-ledger export

pub mod config;
pub mod export;
pub mod grid;
pub mod metrics;
pub mod runner;

pub use config::{RunId, RunRequest};
pub use export::write_trades_csv;
pub use grid::{GridSearch, ParamGrid, SweepError, SweepOutcome};
pub use metrics::BacktestMetrics;
pub use runner::{run_single_backtest, RunResult, NO_DATA_ERROR};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn metrics_are_send_sync() {
        assert_send::<BacktestMetrics>();
        assert_sync::<BacktestMetrics>();
    }

    #[test]
    fn run_result_is_send_sync() {
        assert_send::<RunResult>();
        assert_sync::<RunResult>();
    }

    #[test]
    fn sweep_outcome_is_send_sync() {
        assert_send::<SweepOutcome>();
        assert_sync::<SweepOutcome>();
    }

    #[test]
    fn grid_types_are_send_sync() {
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
        assert_send::<GridSearch>();
        assert_sync::<GridSearch>();
    }

    #[test]
    fn run_request_is_send_sync() {
        assert_send::<RunRequest>();
        assert_sync::<RunRequest>();
    }
}
