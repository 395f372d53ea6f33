//! Trading-session calendar — America/New_York, regular and extended hours.
//!
//! Every session-open and same-day decision in the engine funnels through
//! this one calendar; host-local time is never consulted. Exchange holidays
//! are not modeled — a holiday simply produces no bars.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

/// The exchange calendar timezone.
pub const TRADING_TZ: Tz = New_York;

/// Regular session open, minutes after ET midnight (09:30).
const REGULAR_OPEN_MIN: u32 = 9 * 60 + 30;
/// Regular session close (16:00).
const REGULAR_CLOSE_MIN: u32 = 16 * 60;
/// Extended session open (04:00).
const EXTENDED_OPEN_MIN: u32 = 4 * 60;
/// Extended session close (20:00).
const EXTENDED_CLOSE_MIN: u32 = 20 * 60;

/// Exchange-calendar date of an instant.
pub fn trading_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&TRADING_TZ).date_naive()
}

/// Whether trading is permitted at `ts`.
///
/// Regular session: 09:30-16:00 ET. Extended: 04:00-20:00 ET. Weekends are
/// closed in both modes.
pub fn is_session_open(ts: DateTime<Utc>, extended_hours: bool) -> bool {
    let local = ts.with_timezone(&TRADING_TZ);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let minutes = local.hour() * 60 + local.minute();
    if extended_hours {
        (EXTENDED_OPEN_MIN..EXTENDED_CLOSE_MIN).contains(&minutes)
    } else {
        (REGULAR_OPEN_MIN..REGULAR_CLOSE_MIN).contains(&minutes)
    }
}

/// 09:30 ET on `date`, as a UTC instant.
pub fn at_session_open(date: NaiveDate) -> DateTime<Utc> {
    local_instant(date, NaiveTime::from_hms_opt(9, 30, 0).unwrap())
}

/// 16:00 ET on `date`, as a UTC instant.
pub fn at_session_close(date: NaiveDate) -> DateTime<Utc> {
    local_instant(date, NaiveTime::from_hms_opt(16, 0, 0).unwrap())
}

/// ET midnight at the start of `date`, as a UTC instant.
pub fn range_start(date: NaiveDate) -> DateTime<Utc> {
    local_instant(date, NaiveTime::MIN)
}

/// Last second of `date` in ET, as a UTC instant.
pub fn range_end(date: NaiveDate) -> DateTime<Utc> {
    local_instant(date, NaiveTime::from_hms_opt(23, 59, 59).unwrap())
}

fn local_instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    // `earliest()` is None only inside the 02:00 DST gap, which no session
    // boundary touches; the fallback keeps the function total.
    TRADING_TZ
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| TRADING_TZ.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}
