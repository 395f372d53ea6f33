//! DipLab Core — domain types, fee model, PDT governor, session calendar,
//! and the single-run event loop.
//!
//! This crate contains the heart of the dip-buying simulation engine:
//! - Domain types (bars, open positions, closed trades, equity points)
//! - Regulatory fee model (TAF/CAT)
//! - PDT governor with a rolling 5-business-day day-trade window
//! - America/New_York trading-session calendar
//! - Bar source seam with CSV and deterministic synthetic implementations
//! - Chronological multi-symbol event loop

pub mod data;
pub mod domain;
pub mod engine;
pub mod fees;
pub mod pdt;
pub mod session;
