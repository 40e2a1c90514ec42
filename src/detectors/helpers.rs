//! Common helper functions shared across detector modules
//!
//! Volatility, interval and range-position arithmetic.

use crate::params::ZoneThresholds;
use crate::{OHLCVExt, Period, Zone, OHLCV};

/// Ranges narrower than this are treated as flat
pub const FLAT_RANGE_EPSILON: f64 = 1e-12;

// ============================================================
// VOLATILITY
// ============================================================

/// True range of a bar given the previous close (plain range for the first bar)
#[inline]
pub fn true_range<T: OHLCV>(bar: &T, prev_close: Option<f64>) -> f64 {
    let range = bar.range();
    match prev_close {
        Some(pc) => range
            .max((bar.high() - pc).abs())
            .max((bar.low() - pc).abs()),
        None => range,
    }
}

/// Average true range over the trailing `period` bars ending at the last bar.
///
/// Uses every available bar when the series is shorter than `period`.
/// Returns 0.0 for an empty series.
pub fn atr<T: OHLCV>(bars: &[T], period: Period) -> f64 {
    let n = bars.len();
    if n == 0 {
        return 0.0;
    }
    let start = n.saturating_sub(period.get());
    let sum: f64 = (start..n)
        .map(|i| {
            let prev_close = i.checked_sub(1).map(|p| bars[p].close());
            true_range(&bars[i], prev_close)
        })
        .sum();
    sum / (n - start) as f64
}

// ============================================================
// INTERVALS AND RANGES
// ============================================================

/// Closed intervals [a_low, a_high] and [b_low, b_high] share at least one point
#[inline]
pub fn intervals_overlap(a_low: f64, a_high: f64, b_low: f64, b_high: f64) -> bool {
    a_low <= b_high && b_low <= a_high
}

/// Position of `price` inside [low, high] as 0.0..=1.0 (clamped).
/// Returns None if the range is flat.
#[inline]
pub fn range_position(price: f64, low: f64, high: f64) -> Option<f64> {
    let width = high - low;
    (width > FLAT_RANGE_EPSILON).then(|| ((price - low) / width).clamp(0.0, 1.0))
}

/// Discount below the lower threshold, premium above the upper one.
/// A flat range classifies as equilibrium.
pub fn classify_zone(price: f64, low: f64, high: f64, zones: &ZoneThresholds) -> Zone {
    match range_position(price, low, high) {
        Some(p) if p < zones.discount.get() => Zone::Discount,
        Some(p) if p > zones.premium.get() => Zone::Premium,
        _ => Zone::Equilibrium,
    }
}
