//! Canonical bar type and series normalization

use tracing::debug;

use crate::{DataError, OHLCVExt, Period, OHLCV};

/// Canonical daily bar. Every detector downstream of [`normalize`] sees these.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn from_ohlcv<T: OHLCV + ?Sized>(bar: &T) -> Self {
        Self::new(
            bar.timestamp(),
            bar.open(),
            bar.high(),
            bar.low(),
            bar.close(),
            bar.volume(),
        )
    }
}

impl OHLCV for Bar {
    #[inline]
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[inline]
    fn open(&self) -> f64 {
        self.open
    }

    #[inline]
    fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn close(&self) -> f64 {
        self.close
    }

    #[inline]
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Validate and canonicalize a raw series.
///
/// Rows with a non-finite field count as missing and are dropped. The
/// survivors are sorted by timestamp (stable) and, for a repeated timestamp,
/// the record appearing last in the input wins. Only the kept records are
/// checked: a superseded record never fails the series, while a kept one with
/// inconsistent prices does. The result is strictly increasing by timestamp
/// and holds at least `2 * swing_length` bars.
pub fn normalize<T: OHLCV>(raw: &[T], swing_length: Period) -> Result<Vec<Bar>, DataError> {
    let need = 2 * swing_length.get();

    let mut bars: Vec<Bar> = raw.iter().filter(|row| row.is_finite()).map(Bar::from_ohlcv).collect();
    let dropped = raw.len() - bars.len();

    bars.sort_by_key(|b| b.timestamp);

    let mut canonical: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match canonical.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
            _ => canonical.push(bar),
        }
    }
    let duplicates = raw.len() - dropped - canonical.len();

    for bar in &canonical {
        bar.validate()?;
    }

    if dropped > 0 || duplicates > 0 {
        debug!(dropped, duplicates, kept = canonical.len(), "normalized bar series");
    }

    if canonical.len() < need {
        return Err(DataError::InsufficientData {
            need,
            got: canonical.len(),
        });
    }

    Ok(canonical)
}
