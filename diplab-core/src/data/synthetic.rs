//! Deterministic synthetic bars — a seeded random walk per symbol.
//!
//! Used by tests, benches, and the CLI's offline demo mode. Seeds derive
//! from BLAKE3 of (master seed, symbol), so a symbol's series is identical
//! across runs and thread schedules, and independent of fetch order.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Bar;
use crate::session;

use super::source::{BarSource, FeedError, Interval};

/// Bar source generating a seeded random walk.
pub struct SyntheticSource {
    master_seed: u64,
    start_price: f64,
    daily_vol: f64,
}

impl SyntheticSource {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            start_price: 100.0,
            daily_vol: 0.02,
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_daily_vol(mut self, vol: f64) -> Self {
        self.daily_vol = vol;
        self
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap())
    }
}

/// Bar step for intraday generation, in minutes.
fn step_minutes(interval: Interval) -> i64 {
    match interval {
        Interval::Day => 0,
        Interval::Hour1 => 60,
        Interval::Min30 => 30,
        Interval::Min15 => 15,
        Interval::Min5 => 5,
        Interval::Min1 => 1,
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Bar>, FeedError> {
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let mut price = self.start_price;
        let mut bars = Vec::new();

        let mut date = session::trading_date(start);
        let end_date = session::trading_date(end);
        while date <= end_date {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                match interval {
                    Interval::Day => {
                        let bar = walk_bar(
                            &mut rng,
                            symbol,
                            session::at_session_open(date),
                            price,
                            self.daily_vol,
                        );
                        price = bar.close;
                        bars.push(bar);
                    }
                    _ => {
                        price = self.intraday_session(
                            &mut rng,
                            symbol,
                            date,
                            price,
                            interval,
                            &mut bars,
                        );
                    }
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        bars.retain(|b| b.ts >= start && b.ts <= end);
        Ok(bars)
    }
}

impl SyntheticSource {
    /// Generate one regular session (09:30-16:00) of intraday bars.
    ///
    /// Per-bar volatility is the daily volatility scaled by 1/sqrt(bars),
    /// so intraday and daily series drift at comparable rates.
    fn intraday_session(
        &self,
        rng: &mut StdRng,
        symbol: &str,
        date: NaiveDate,
        mut price: f64,
        interval: Interval,
        bars: &mut Vec<Bar>,
    ) -> f64 {
        let step = step_minutes(interval);
        let open = session::at_session_open(date);
        let close = session::at_session_close(date);
        let bars_per_session = ((close - open).num_minutes() / step).max(1);
        let bar_vol = self.daily_vol / (bars_per_session as f64).sqrt();

        let mut ts = open;
        while ts < close {
            let bar = walk_bar(rng, symbol, ts, price, bar_vol);
            price = bar.close;
            bars.push(bar);
            ts += Duration::minutes(step);
        }
        price
    }
}

/// One random-walk bar starting from `open_price`.
fn walk_bar(rng: &mut StdRng, symbol: &str, ts: DateTime<Utc>, open_price: f64, vol: f64) -> Bar {
    let drift: f64 = rng.gen_range(-vol..vol);
    let close = (open_price * (1.0 + drift)).max(0.01);
    let body_high = open_price.max(close);
    let body_low = open_price.min(close);
    let high = body_high * (1.0 + rng.gen_range(0.0..vol / 2.0));
    let low = (body_low * (1.0 - rng.gen_range(0.0..vol / 2.0))).max(0.01);
    let volume = rng.gen_range(100_000u64..5_000_000);

    Bar {
        symbol: symbol.to_string(),
        ts,
        open: open_price,
        high,
        low,
        close,
        volume,
    }
}
