//! Order blocks: the last opposing candle run before a structure break
//!
//! For a bullish break the block is the most recent run of bearish candles
//! between the broken swing and the break bar; bearish breaks mirror this.

use tracing::debug;

use super::helpers::{classify_zone, intervals_overlap};
use super::swing::StructureEvent;
use crate::params::ZoneThresholds;
use crate::{Direction, OHLCVExt, Zone, OHLCV};

/// Supply/demand zone tied to a structure break
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OrderBlock {
    pub start_index: usize,
    pub end_index: usize,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub top: f64,
    pub bottom: f64,
    /// Direction of the break the block anticipates
    pub direction: Direction,
    pub zone: Zone,
    pub mitigated: bool,
    /// First bar after the break closing through the block
    pub mitigated_index: Option<usize>,
    /// Unmitigated same-direction blocks intersecting this one
    pub overlap_count: usize,
    /// Summed volume of the block's candles
    pub volume: f64,
    /// Break bar that produced the block
    pub event_index: usize,
}

impl OrderBlock {
    #[inline]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    #[inline]
    pub fn overlaps(&self, other: &OrderBlock) -> bool {
        intervals_overlap(self.bottom, self.top, other.bottom, other.top)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBlockDetector {
    pub zones: ZoneThresholds,
}

impl OrderBlockDetector {
    pub fn new(zones: ZoneThresholds) -> Self {
        Self { zones }
    }

    pub fn detect<T: OHLCV>(&self, bars: &[T], events: &[StructureEvent]) -> Vec<OrderBlock> {
        let mut blocks: Vec<OrderBlock> = Vec::with_capacity(events.len());

        for event in events {
            let Some(block) = self.locate(bars, event) else {
                continue;
            };
            let duplicate = blocks.iter().any(|b| {
                b.start_index == block.start_index
                    && b.end_index == block.end_index
                    && b.direction == block.direction
            });
            if !duplicate {
                blocks.push(block);
            }
        }

        count_overlaps(&mut blocks);

        debug!(
            blocks = blocks.len(),
            unmitigated = blocks.iter().filter(|b| !b.mitigated).count(),
            "order blocks extracted"
        );
        blocks
    }

    fn locate<T: OHLCV>(&self, bars: &[T], event: &StructureEvent) -> Option<OrderBlock> {
        let direction = event.direction;
        let opposing = |bar: &T| match direction {
            Direction::Bullish => bar.is_bearish(),
            Direction::Bearish => bar.is_bullish(),
        };

        let floor = event.broken_swing.index + 1;
        let brk = event.index.min(bars.len());
        let end = (floor..brk).rev().find(|&i| opposing(&bars[i]))?;
        let mut start = end;
        while start > floor && opposing(&bars[start - 1]) {
            start -= 1;
        }

        let run = &bars[start..=end];
        let top = run.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
        let bottom = run.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
        let volume = run.iter().map(|b| b.volume()).sum();

        let mitigated_index = bars
            .iter()
            .enumerate()
            .skip(event.index + 1)
            .find(|(_, bar)| match direction {
                Direction::Bullish => bar.close() < bottom,
                Direction::Bearish => bar.close() > top,
            })
            .map(|(i, _)| i);

        let mut block = OrderBlock {
            start_index: start,
            end_index: end,
            start_timestamp: bars[start].timestamp(),
            end_timestamp: bars[end].timestamp(),
            top,
            bottom,
            direction,
            zone: Zone::Equilibrium,
            mitigated: mitigated_index.is_some(),
            mitigated_index,
            overlap_count: 0,
            volume,
            event_index: event.index,
        };
        let range = event.active_range;
        block.zone = classify_zone(block.midpoint(), range.low, range.high, &self.zones);
        Some(block)
    }
}

/// Pairwise intersections among unmitigated blocks sharing a direction.
/// Mitigated blocks count zero.
fn count_overlaps(blocks: &mut [OrderBlock]) {
    let counts: Vec<usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, a)| {
            if a.mitigated {
                return 0;
            }
            blocks
                .iter()
                .enumerate()
                .filter(|&(j, b)| {
                    j != i && !b.mitigated && b.direction == a.direction && a.overlaps(b)
                })
                .count()
        })
        .collect();

    for (block, count) in blocks.iter_mut().zip(counts) {
        block.overlap_count = count;
    }
}
