//! Fair value gaps: three-bar imbalances
//!
//! For bars b1, b2, b3 a bullish gap exists iff `b1.high < b3.low`, spanning
//! `[b1.high, b3.low]`; a bearish gap exists iff `b1.low > b3.high`, spanning
//! `[b3.high, b1.low]`. A gap is filled by the first later bar whose range
//! covers it entirely.

use tracing::debug;

use crate::{Direction, Trend, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FairValueGap {
    /// Index of b1
    pub start_index: usize,
    /// Index of b3
    pub end_index: usize,
    pub timestamp: i64,
    pub top: f64,
    pub bottom: f64,
    pub direction: Direction,
    pub filled: bool,
    pub filled_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FvgDetector;

impl FvgDetector {
    /// Single pass: every bar first tries to fill the open gaps formed before
    /// it, then closes a new triplet as b3.
    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<FairValueGap> {
        let mut gaps: Vec<FairValueGap> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        for (i, bar) in bars.iter().enumerate() {
            open.retain(|&g| {
                let gap = &mut gaps[g];
                if bar.low() <= gap.bottom && bar.high() >= gap.top {
                    gap.filled = true;
                    gap.filled_index = Some(i);
                    false
                } else {
                    true
                }
            });

            if i < 2 {
                continue;
            }
            let b1 = &bars[i - 2];
            let (bottom, top, direction) = if b1.high() < bar.low() {
                (b1.high(), bar.low(), Direction::Bullish)
            } else if b1.low() > bar.high() {
                (bar.high(), b1.low(), Direction::Bearish)
            } else {
                continue;
            };

            open.push(gaps.len());
            gaps.push(FairValueGap {
                start_index: i - 2,
                end_index: i,
                timestamp: bar.timestamp(),
                top,
                bottom,
                direction,
                filled: false,
                filled_index: None,
            });
        }

        debug!(gaps = gaps.len(), unfilled = open.len(), "fair value gaps detected");
        gaps
    }
}

/// Unfilled gaps whose direction matches `trend`. Nothing aligns with a
/// ranging market.
pub fn aligned_fvgs(fvgs: &[FairValueGap], trend: Trend) -> impl Iterator<Item = &FairValueGap> {
    let direction = trend.direction();
    fvgs.iter()
        .filter(move |g| !g.filled && Some(g.direction) == direction)
}
