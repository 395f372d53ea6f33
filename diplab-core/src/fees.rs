//! Regulatory trading fees — FINRA TAF and CAT.
//!
//! Pure functions of a share count. TAF applies to the sell leg only,
//! rounded up to the cent and capped per trade; CAT applies to each leg,
//! linear and uncapped.

/// TAF rate per share sold.
const TAF_PER_SHARE: f64 = 0.000166;

/// TAF cap per trade, in dollars.
const TAF_CAP: f64 = 8.30;

/// CAT rate per share, either leg (NMS equities, 1:1 ratio).
const CAT_PER_SHARE: f64 = 0.000_026_5;

/// FINRA Trading Activity Fee for a sell of `shares`.
///
/// Rounded up to the nearest cent and capped at $8.30. Returns 0.0 for
/// non-positive share counts.
pub fn taf_fee(shares: i64) -> f64 {
    if shares <= 0 {
        return 0.0;
    }
    let raw = shares as f64 * TAF_PER_SHARE;
    let fee = (raw * 100.0).ceil() / 100.0;
    fee.min(TAF_CAP)
}

/// Consolidated Audit Trail fee for one leg of `shares`.
///
/// Linear and uncapped. Returns 0.0 for non-positive share counts.
pub fn cat_fee(shares: i64) -> f64 {
    if shares <= 0 {
        return 0.0;
    }
    shares as f64 * CAT_PER_SHARE
}

/// Fee components for one full round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripFees {
    /// TAF on the exit shares (sell side only).
    pub taf: f64,
    /// CAT on the entry leg plus CAT on the exit leg.
    pub cat: f64,
    pub total: f64,
}

/// Fees for a round trip entered and exited with the same share count.
pub fn round_trip_fees(shares: i64) -> RoundTripFees {
    let taf = taf_fee(shares);
    let cat = cat_fee(shares) + cat_fee(shares);
    RoundTripFees {
        taf,
        cat,
        total: taf + cat,
    }
}
