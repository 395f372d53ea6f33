//! The single-run simulator — a chronological replay of one strategy
//! configuration over one symbol set.
//!
//! Each distinct timestamp across the union of all symbols' bars is
//! processed in ascending order: exits first, then the session gate and
//! entries, then one equity snapshot. Exits settle before entries so a tick's
//! entries see post-exit cash and never a stale position for the same symbol.
//! The loop is single-threaded and fully deterministic: identical inputs
//! produce identical ledgers.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Interval, MarketSnapshot};
use crate::domain::{Bar, ClosedTrade, Direction, EquityPoint, OpenPosition};
use crate::fees;
use crate::pdt::{DayTradeRecord, PdtTracker};
use crate::session;

use super::config::{SimConfig, StrategyParams};

/// Simulation failure modes.
#[derive(Debug, Error)]
pub enum SimError {
    /// The snapshot held no bars for any requested symbol/range.
    #[error("no price data for any symbol in the requested range")]
    NoData,
}

/// Output of one simulation run: the ledger and the equity curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimOutput {
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// How a position left the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitKind {
    Target,
    Stop,
    TimeLimit,
}

/// A resolved exit before it is written to the ledger.
struct ExitFill {
    kind: ExitKind,
    price: f64,
    /// Ledger timestamp: the fine-bar instant for intraday exits, the
    /// session close for coarse daily exits, the tick itself otherwise.
    ts: DateTime<Utc>,
}

/// Run one simulation against a read-only snapshot.
///
/// `pdt_bootstrap` seeds the governor with day trades from a prior session
/// so the rolling window accounts for them.
pub fn run_simulation(
    config: &SimConfig,
    snapshot: &MarketSnapshot,
    pdt_bootstrap: &[DayTradeRecord],
) -> Result<SimOutput, SimError> {
    Simulator::new(config, snapshot, pdt_bootstrap).run()
}

struct Simulator<'a> {
    snapshot: &'a MarketSnapshot,
    symbols: Vec<String>,
    params: StrategyParams,
    interval: Interval,
    extended_hours: bool,
    intraday_exit: bool,
    pdt_enforced: bool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,

    cash: f64,
    positions: BTreeMap<String, OpenPosition>,
    tracker: PdtTracker,
    trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
}

impl<'a> Simulator<'a> {
    fn new(
        config: &SimConfig,
        snapshot: &'a MarketSnapshot,
        pdt_bootstrap: &[DayTradeRecord],
    ) -> Self {
        Self {
            snapshot,
            symbols: config.symbols.clone(),
            params: config.params,
            interval: config.interval,
            extended_hours: config.extended_hours,
            intraday_exit: config.intraday_exit,
            pdt_enforced: config.pdt_enforced(),
            start: config.start,
            end: config.end,
            cash: config.initial_capital,
            positions: BTreeMap::new(),
            tracker: PdtTracker::bootstrap(pdt_bootstrap),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    fn run(mut self) -> Result<SimOutput, SimError> {
        let timestamps = self.snapshot.union_timestamps(self.start, self.end);
        if timestamps.is_empty() {
            return Err(SimError::NoData);
        }

        for ts in timestamps {
            self.process_exits(ts);
            if session::is_session_open(ts, self.extended_hours) {
                self.process_entries(ts);
            }
            self.record_equity(ts);
        }

        Ok(SimOutput {
            trades: self.trades,
            equity_curve: self.equity_curve,
        })
    }

    /// Exit pass — runs before entries at the same timestamp.
    ///
    /// Positions are visited in symbol order (BTreeMap iteration), which
    /// fixes the equity snapshots when several exits land on one tick.
    fn process_exits(&mut self, ts: DateTime<Utc>) {
        let today = session::trading_date(ts);
        let open_symbols: Vec<String> = self.positions.keys().cloned().collect();

        for symbol in open_symbols {
            let Some(bar) = self.bar_at(&symbol, ts).cloned() else {
                continue;
            };
            let Some(position) = self.positions.get(&symbol).cloned() else {
                continue;
            };

            let same_day = position.entry_date == today;
            // A blocked same-day exit stays open and is retried next tick
            // rather than breaking the day-trade limit.
            if same_day && self.pdt_enforced && !self.tracker.can_day_trade(today) {
                continue;
            }

            let fill = self
                .intraday_fill(&symbol, &position, today)
                .or_else(|| self.coarse_fill(&position, &bar, ts));
            let Some(fill) = fill else { continue };

            self.close_position(&symbol, position, fill, ts, same_day, today);
        }
    }

    /// Scan the day's 5-minute bars for the first stop/target touch.
    ///
    /// Stop wins when both trigger inside the same fine bar.
    fn intraday_fill(
        &self,
        symbol: &str,
        position: &OpenPosition,
        today: NaiveDate,
    ) -> Option<ExitFill> {
        if !self.intraday_exit {
            return None;
        }
        let fine = self.snapshot.intraday.get(symbol)?;
        for bar in fine
            .iter()
            .filter(|b| session::trading_date(b.ts) == today)
        {
            if bar.low <= position.stop_price {
                return Some(ExitFill {
                    kind: ExitKind::Stop,
                    price: position.stop_price,
                    ts: bar.ts,
                });
            }
            if bar.high >= position.target_price {
                return Some(ExitFill {
                    kind: ExitKind::Target,
                    price: position.target_price,
                    ts: bar.ts,
                });
            }
        }
        None
    }

    /// Resolve an exit against the coarse bar: stop, then target, then the
    /// time limit at the close.
    ///
    /// Within one ambiguous bar the stop is assumed to hit first — adverse
    /// moves are taken before favorable ones.
    fn coarse_fill(&self, position: &OpenPosition, bar: &Bar, ts: DateTime<Utc>) -> Option<ExitFill> {
        let exit_ts = self.coarse_exit_ts(ts);
        if bar.low <= position.stop_price {
            return Some(ExitFill {
                kind: ExitKind::Stop,
                price: position.stop_price,
                ts: exit_ts,
            });
        }
        if bar.high >= position.target_price {
            return Some(ExitFill {
                kind: ExitKind::Target,
                price: position.target_price,
                ts: exit_ts,
            });
        }
        if ts >= position.max_exit_ts {
            return Some(ExitFill {
                kind: ExitKind::TimeLimit,
                price: bar.close,
                ts: exit_ts,
            });
        }
        None
    }

    /// Coarse exits on daily bars are stamped at the session close.
    fn coarse_exit_ts(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self.interval {
            Interval::Day => session::at_session_close(session::trading_date(ts)),
            _ => ts,
        }
    }

    fn close_position(
        &mut self,
        symbol: &str,
        position: OpenPosition,
        fill: ExitFill,
        ts: DateTime<Utc>,
        same_day: bool,
        today: NaiveDate,
    ) {
        let fees = fees::round_trip_fees(position.shares);
        let gross = (fill.price - position.entry_price) * position.shares as f64;
        let pnl = gross - fees.total;

        self.cash += position.cost_basis() + pnl;
        self.positions.remove(symbol);

        let pnl_pct = (fill.price - position.entry_price) / position.entry_price * 100.0;
        let equity_after = self.cash + self.open_market_value(ts);

        self.trades.push(ClosedTrade {
            entry_time: position.entry_ts,
            exit_time: fill.ts,
            symbol: symbol.to_string(),
            direction: Direction::Long,
            shares: position.shares,
            entry_price: position.entry_price,
            exit_price: fill.price,
            target_price: position.target_price,
            stop_price: position.stop_price,
            hit_target: fill.kind == ExitKind::Target,
            hit_stop: fill.kind == ExitKind::Stop,
            pnl,
            pnl_pct,
            equity_after,
            dip_pct: position.dip_pct * 100.0,
            taf_fee: fees.taf,
            cat_fee: fees.cat,
            total_fees: fees.total,
        });

        if same_day && self.pdt_enforced {
            self.tracker.record_day_trade(today, symbol);
        }
    }

    /// Entry pass — dip trigger against the trailing rolling high.
    fn process_entries(&mut self, ts: DateTime<Utc>) {
        let lookback = self.interval.lookback_bars();

        for i in 0..self.symbols.len() {
            let symbol = self.symbols[i].clone();
            if self.positions.contains_key(&symbol) {
                continue;
            }
            let Some(bars) = self.snapshot.bars.get(&symbol) else {
                continue;
            };

            // History up to and including the current tick.
            let upto = bars.partition_point(|b| b.ts <= ts);
            if upto < lookback {
                continue;
            }
            let window = &bars[upto - lookback..upto];
            let rolling_high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let close = bars[upto - 1].close;
            if rolling_high <= 0.0 {
                continue;
            }

            let dip = (rolling_high - close) / rolling_high;
            if dip < self.params.dip_threshold {
                continue;
            }

            let mut shares = (self.cash * self.params.position_size / close).floor() as i64;
            if shares <= 0 {
                continue;
            }
            let mut cost = close * shares as f64;
            if cost > self.cash {
                shares = (self.cash / close).floor() as i64;
                cost = close * shares as f64;
                if shares <= 0 {
                    continue;
                }
            }
            self.cash -= cost;

            self.positions.insert(
                symbol,
                OpenPosition {
                    entry_ts: ts,
                    entry_date: session::trading_date(ts),
                    entry_price: close,
                    shares,
                    target_price: close * (1.0 + self.params.take_profit),
                    stop_price: close * (1.0 - self.params.stop_loss),
                    max_exit_ts: ts + Duration::days(self.params.hold_days),
                    dip_pct: dip,
                },
            );
        }
    }

    /// One equity point per processed timestamp: cash plus open positions
    /// marked at the latest close.
    fn record_equity(&mut self, ts: DateTime<Utc>) {
        let equity = self.cash + self.open_market_value(ts);
        self.equity_curve.push(EquityPoint { ts, equity });
    }

    /// Mark-to-market value of all open positions at the latest close at or
    /// before `ts`.
    fn open_market_value(&self, ts: DateTime<Utc>) -> f64 {
        self.positions
            .iter()
            .map(|(symbol, position)| {
                self.last_close_at(symbol, ts)
                    .map(|close| position.market_value(close))
                    .unwrap_or_else(|| position.cost_basis())
            })
            .sum()
    }

    /// The primary bar with exactly this timestamp, if any.
    fn bar_at(&self, symbol: &str, ts: DateTime<Utc>) -> Option<&Bar> {
        let bars = self.snapshot.bars.get(symbol)?;
        let idx = bars.partition_point(|b| b.ts < ts);
        bars.get(idx).filter(|b| b.ts == ts)
    }

    /// Close of the latest bar at or before `ts`.
    fn last_close_at(&self, symbol: &str, ts: DateTime<Utc>) -> Option<f64> {
        let bars = self.snapshot.bars.get(symbol)?;
        let upto = bars.partition_point(|b| b.ts <= ts);
        if upto == 0 {
            None
        } else {
            Some(bars[upto - 1].close)
        }
    }
}
