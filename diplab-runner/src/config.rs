//! Serializable run request — everything needed to reproduce a sweep.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use diplab_core::data::Interval;
use diplab_core::engine::SimConfig;
use diplab_core::session;

use crate::grid::ParamGrid;

/// Unique identifier for a run request (content-addressed hash).
pub type RunId = String;

/// A complete, serializable description of a backtest request.
///
/// Identical requests hash to identical RunIds, so downstream consumers can
/// key caches and stored artifacts on the request content alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub symbols: Vec<String>,
    /// First trading date included in the run.
    pub start_date: NaiveDate,
    /// Last trading date included in the run.
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default)]
    pub extended_hours: bool,
    #[serde(default)]
    pub intraday_exit: bool,
    /// Override PDT enforcement; absent applies the under-$25k default.
    #[serde(default)]
    pub pdt_protection: Option<bool>,
    #[serde(default)]
    pub grid: ParamGrid,
}

fn default_initial_capital() -> f64 {
    10_000.0
}

fn default_interval() -> Interval {
    Interval::Day
}

impl RunRequest {
    /// Deterministic content hash — identical requests share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunRequest serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Lower the request into an engine config. The grid fills in `params`
    /// per variation; a single run takes the first grid combination.
    pub fn to_sim_config(&self) -> SimConfig {
        SimConfig {
            symbols: self.symbols.clone(),
            start: session::range_start(self.start_date),
            end: session::range_end(self.end_date),
            initial_capital: self.initial_capital,
            params: self
                .grid
                .enumerate()
                .into_iter()
                .next()
                .unwrap_or_default(),
            interval: self.interval,
            extended_hours: self.extended_hours,
            intraday_exit: self.intraday_exit,
            pdt_protection: self.pdt_protection,
        }
    }
}
