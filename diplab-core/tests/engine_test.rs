//! End-to-end engine tests: dip entries, exit precedence, PDT gating,
//! session gating, intraday exit precision, determinism.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use diplab_core::data::{Interval, MarketSnapshot};
use diplab_core::domain::Bar;
use diplab_core::engine::{run_simulation, SimConfig};
use diplab_core::fees;
use diplab_core::pdt::DayTradeRecord;
use diplab_core::session;

// ── Fixtures ─────────────────────────────────────────────────────────

/// Daily bars on consecutive weekdays starting at `first`, one
/// `(high, low, close)` triple per session.
fn daily_bars(symbol: &str, first: NaiveDate, spec: &[(f64, f64, f64)]) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut date = first;
    for &(high, low, close) in spec {
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = date.succ_opt().unwrap();
        }
        bars.push(Bar {
            symbol: symbol.to_string(),
            ts: session::at_session_open(date),
            open: close,
            high,
            low,
            close,
            volume: 1_000_000,
        });
        date = date.succ_opt().unwrap();
    }
    bars
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// 20 flat sessions at 100, then a 10% dip to 90, then `extra`.
fn dip_spec(extra: &[(f64, f64, f64)]) -> Vec<(f64, f64, f64)> {
    let mut spec = vec![(100.0, 99.0, 100.0); 20];
    spec.push((91.0, 89.9, 90.0));
    spec.extend_from_slice(extra);
    spec
}

fn snapshot_of(bars_by_symbol: Vec<Vec<Bar>>) -> MarketSnapshot {
    let mut snapshot = MarketSnapshot::default();
    for bars in bars_by_symbol {
        let symbol = bars[0].symbol.clone();
        snapshot.bars.insert(symbol, bars);
    }
    snapshot
}

fn config_for(snapshot: &MarketSnapshot, capital: f64) -> SimConfig {
    let first = snapshot
        .bars
        .values()
        .filter_map(|b| b.first())
        .map(|b| b.ts)
        .min()
        .unwrap();
    let last = snapshot
        .bars
        .values()
        .filter_map(|b| b.last())
        .map(|b| b.ts)
        .max()
        .unwrap();
    SimConfig::new(
        snapshot.bars.keys().cloned().collect(),
        first,
        last + Duration::days(1),
        capital,
    )
}

// ── Concrete scenario ────────────────────────────────────────────────

#[test]
fn concrete_dip_entry_and_take_profit() {
    // $10k account, 10% sizing, 5% dip threshold. A 20-bar rolling high of
    // $100 followed by a $90 close is a 10% dip: 11 shares at $90.00,
    // cash debited to $9,010. The next bar touches $91 with the target at
    // $90.90: the position closes there.
    let snapshot = snapshot_of(vec![daily_bars(
        "AAPL",
        monday(),
        &dip_spec(&[(91.0, 90.0, 90.8)]),
    )]);
    let config = config_for(&snapshot, 10_000.0);
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    assert_eq!(output.trades.len(), 1);
    let trade = &output.trades[0];
    assert_eq!(trade.symbol, "AAPL");
    assert_eq!(trade.shares, 11);
    assert!((trade.entry_price - 90.0).abs() < 1e-12);
    assert!(trade.hit_target);
    assert!((trade.dip_pct - 10.0).abs() < 1e-9);

    // PnL = (90.90 - 90.00) * 11 - fees ≈ $9.90 minus fees.
    let fees = fees::round_trip_fees(11);
    let expected = (trade.exit_price - 90.0) * 11.0 - fees.total;
    assert!((trade.pnl - expected).abs() < 1e-9);
    assert!((trade.pnl - 9.89).abs() < 0.01);
    assert!((trade.equity_after - (10_000.0 + trade.pnl)).abs() < 1e-9);

    // The entry tick's equity shows cash 9,010 + 11 x 90 = 10,000.
    assert!((output.equity_curve[20].equity - 10_000.0).abs() < 1e-9);
}

#[test]
fn pnl_reconciles_for_every_trade() {
    let snapshot = snapshot_of(vec![daily_bars(
        "AAPL",
        monday(),
        &dip_spec(&[
            (92.0, 89.0, 91.0),
            (91.5, 90.2, 90.4),
            (91.0, 89.4, 90.0),
            (92.0, 90.0, 91.5),
        ]),
    )]);
    let config = config_for(&snapshot, 10_000.0);
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    assert!(!output.trades.is_empty());
    for trade in &output.trades {
        let expected =
            (trade.exit_price - trade.entry_price) * trade.shares as f64 - trade.total_fees;
        assert!(
            (trade.pnl - expected).abs() < 1e-6,
            "pnl {} != {}",
            trade.pnl,
            expected
        );
        assert!(trade.exit_time >= trade.entry_time);
    }
}

// ── Exit precedence ──────────────────────────────────────────────────

#[test]
fn stop_wins_on_a_coarse_bar_spanning_both_levels() {
    let snapshot = snapshot_of(vec![daily_bars(
        "AAPL",
        monday(),
        &dip_spec(&[(92.0, 89.0, 91.0)]),
    )]);
    let config = config_for(&snapshot, 10_000.0);
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    let trade = &output.trades[0];
    assert!(trade.hit_stop);
    assert!(!trade.hit_target);
    assert!((trade.exit_price - 90.0 * 0.995).abs() < 1e-12);
}

#[test]
fn intraday_bars_resolve_the_ambiguity_in_time_order() {
    // The coarse exit bar spans both levels, but the 5-minute tape shows
    // the target touched first.
    let exit_day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
    let daily = daily_bars("AAPL", monday(), &dip_spec(&[(92.0, 89.0, 91.0)]));

    let open = session::at_session_open(exit_day);
    let fine = vec![
        Bar {
            symbol: "AAPL".into(),
            ts: open,
            open: 90.5,
            high: 91.0, // >= target 90.9, stop untouched
            low: 90.3,
            close: 90.9,
            volume: 10_000,
        },
        Bar {
            symbol: "AAPL".into(),
            ts: open + Duration::minutes(5),
            open: 90.9,
            high: 90.9,
            low: 89.0, // stop would hit here, but the target already did
            close: 89.2,
            volume: 10_000,
        },
    ];

    let mut snapshot = snapshot_of(vec![daily]);
    snapshot.intraday.insert("AAPL".into(), fine);

    let mut config = config_for(&snapshot, 10_000.0);
    config.intraday_exit = true;
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    let trade = &output.trades[0];
    assert!(trade.hit_target, "intraday scan should see the target first");
    assert!(!trade.hit_stop);
    assert_eq!(trade.exit_time, open);
}

#[test]
fn stop_wins_inside_a_single_fine_bar() {
    let exit_day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
    let daily = daily_bars("AAPL", monday(), &dip_spec(&[(92.0, 89.0, 91.0)]));

    // One fine bar spanning both levels: the stop is taken.
    let fine = vec![Bar {
        symbol: "AAPL".into(),
        ts: session::at_session_open(exit_day),
        open: 90.5,
        high: 92.0,
        low: 89.0,
        close: 91.0,
        volume: 10_000,
    }];

    let mut snapshot = snapshot_of(vec![daily]);
    snapshot.intraday.insert("AAPL".into(), fine);

    let mut config = config_for(&snapshot, 10_000.0);
    config.intraday_exit = true;
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    let trade = &output.trades[0];
    assert!(trade.hit_stop);
    assert!(!trade.hit_target);
}

#[test]
fn time_exit_fires_at_the_close_of_the_deadline_bar() {
    // A quiet bar follows the dip entry; with hold_days = 1 the time exit
    // lands on it, at that bar's close.
    let snapshot = snapshot_of(vec![daily_bars(
        "AAPL",
        monday(),
        &dip_spec(&[(90.5, 89.8, 90.2)]),
    )]);
    let mut config = config_for(&snapshot, 10_000.0);
    config.params.hold_days = 1;
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    assert_eq!(output.trades.len(), 1);
    let trade = &output.trades[0];
    assert!(!trade.hit_target);
    assert!(!trade.hit_stop);
    assert!((trade.exit_price - 90.2).abs() < 1e-12);
    assert!(trade.exit_time - trade.entry_time >= Duration::days(1));
    // Daily coarse exits are stamped at the session close.
    assert_eq!(
        trade.exit_time,
        session::at_session_close(session::trading_date(trade.exit_time))
    );
}

// ── Session gate ─────────────────────────────────────────────────────

#[test]
fn entries_are_skipped_outside_the_session() {
    // A dip bar stamped on a Saturday must not open a position; the same
    // dip on the following Monday does.
    let mut bars = daily_bars("AAPL", monday(), &vec![(100.0, 99.0, 100.0); 20]);
    let saturday = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap();
    assert_eq!(saturday.weekday(), Weekday::Sat);
    for (date, high, low, close) in [
        (saturday, 91.0, 89.9, 90.0),                          // Sat: gated
        (saturday.succ_opt().unwrap().succ_opt().unwrap(), 91.0, 89.9, 90.0), // Mon: enters
        (
            NaiveDate::from_ymd_opt(2024, 4, 9).unwrap(),
            91.0,
            90.0,
            90.8,
        ), // Tue: target touch
    ] {
        bars.push(Bar {
            symbol: "AAPL".into(),
            ts: session::at_session_open(date),
            open: close,
            high,
            low,
            close,
            volume: 1_000_000,
        });
    }
    let snapshot = snapshot_of(vec![bars]);
    let config = config_for(&snapshot, 10_000.0);
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    assert_eq!(output.trades.len(), 1);
    // Entry came from Monday's session, not Saturday's bar.
    assert_eq!(
        session::trading_date(output.trades[0].entry_time),
        NaiveDate::from_ymd_opt(2024, 4, 8).unwrap()
    );
}

// ── PDT gating ───────────────────────────────────────────────────────

/// Hourly bars across `days` weekdays, 16 bars per session (04:00-19:00 ET),
/// all flat at `price`, starting at `first`.
fn hourly_flat(symbol: &str, first: NaiveDate, days: usize, price: f64) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut date = first;
    let mut added = 0;
    while added < days {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let midnight = session::range_start(date);
            for hour in 4..20 {
                bars.push(Bar {
                    symbol: symbol.to_string(),
                    ts: midnight + Duration::hours(hour),
                    open: price,
                    high: price + 0.5,
                    low: price - 0.5,
                    close: price,
                    volume: 50_000,
                });
            }
            added += 1;
        }
        date = date.succ_opt().unwrap();
    }
    bars
}

#[test]
fn pdt_defers_a_blocked_same_day_exit_to_the_next_day() {
    // 20 flat days of hourly bars (320 bars of lookback), then a dip bar
    // followed by bars that would take profit the same day.
    let symbol = "AAPL";
    let mut bars = hourly_flat(symbol, monday(), 20, 100.0);
    let last_ts = bars.last().unwrap().ts;
    let next_day = {
        let mut d = session::trading_date(last_ts).succ_opt().unwrap();
        while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            d = d.succ_opt().unwrap();
        }
        d
    };
    let midnight = session::range_start(next_day);
    // 10:00 dip to 90, then 11:00 and 12:00 touch 91 (target is 90.9).
    bars.push(Bar {
        symbol: symbol.into(),
        ts: midnight + Duration::hours(10),
        open: 100.0,
        high: 100.0,
        low: 90.0,
        close: 90.0,
        volume: 50_000,
    });
    for hour in [11, 12] {
        bars.push(Bar {
            symbol: symbol.into(),
            ts: midnight + Duration::hours(hour),
            open: 90.0,
            high: 91.0,
            low: 90.0,
            close: 90.5,
            volume: 50_000,
        });
    }
    // Next weekday: the deferred exit finally fills.
    let day_after = {
        let mut d = next_day.succ_opt().unwrap();
        while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            d = d.succ_opt().unwrap();
        }
        d
    };
    bars.push(Bar {
        symbol: symbol.into(),
        ts: session::range_start(day_after) + Duration::hours(10),
        open: 90.5,
        high: 91.0,
        low: 90.2,
        close: 90.8,
        volume: 50_000,
    });

    let snapshot = snapshot_of(vec![bars]);
    let mut config = config_for(&snapshot, 10_000.0);
    config.interval = Interval::Hour1;
    config.extended_hours = true;

    // Three prior day trades inside the rolling window exhaust the limit.
    let bootstrap: Vec<DayTradeRecord> = (1..=3i64)
        .map(|i| DayTradeRecord {
            date: next_day - Duration::days(i),
            symbol: symbol.into(),
        })
        .collect();

    let blocked = run_simulation(&config, &snapshot, &bootstrap).unwrap();
    assert_eq!(blocked.trades.len(), 1);
    let trade = &blocked.trades[0];
    // The same-day target touch was skipped; the fill came the next day.
    assert_eq!(session::trading_date(trade.exit_time), day_after);
    assert!(trade.hit_target);

    // Without the bootstrap the first exit happens the same day (and may be
    // followed by same-tick re-entries).
    let free = run_simulation(&config, &snapshot, &[]).unwrap();
    assert!(!free.trades.is_empty());
    assert_eq!(
        session::trading_date(free.trades[0].exit_time),
        next_day
    );
    assert_eq!(
        session::trading_date(free.trades[0].entry_time),
        session::trading_date(free.trades[0].exit_time)
    );

    // Disabling protection outright behaves like the free account.
    config.pdt_protection = Some(false);
    let disabled = run_simulation(&config, &snapshot, &bootstrap).unwrap();
    assert_eq!(
        session::trading_date(disabled.trades[0].exit_time),
        next_day
    );
}

// ── Multi-symbol determinism ─────────────────────────────────────────

#[test]
fn multi_symbol_runs_are_deterministic() {
    let a = daily_bars("AAPL", monday(), &dip_spec(&[(92.0, 89.0, 91.0)]));
    let b = daily_bars("MSFT", monday(), &dip_spec(&[(91.5, 90.0, 90.5)]));
    let snapshot = snapshot_of(vec![a, b]);
    let config = config_for(&snapshot, 10_000.0);

    let first = run_simulation(&config, &snapshot, &[]).unwrap();
    let second = run_simulation(&config, &snapshot, &[]).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert!(first.trades.len() >= 2);
}

#[test]
fn at_most_one_position_per_symbol() {
    // Repeated deep dips: the engine may re-enter after each exit but can
    // never hold two positions in one symbol, so every entry has a
    // matching exit before the next entry for that symbol.
    let snapshot = snapshot_of(vec![daily_bars(
        "AAPL",
        monday(),
        &dip_spec(&[
            (92.0, 89.0, 91.0),
            (91.0, 88.0, 89.0),
            (90.0, 87.5, 88.0),
            (89.0, 87.0, 88.5),
        ]),
    )]);
    let config = config_for(&snapshot, 10_000.0);
    let output = run_simulation(&config, &snapshot, &[]).unwrap();

    let mut trades = output.trades.clone();
    trades.sort_by_key(|t| t.entry_time);
    for pair in trades.windows(2) {
        assert!(
            pair[1].entry_time >= pair[0].exit_time
                || session::trading_date(pair[1].entry_time)
                    == session::trading_date(pair[0].exit_time),
            "overlapping positions in one symbol"
        );
    }
}
