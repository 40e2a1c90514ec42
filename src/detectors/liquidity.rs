//! Liquidity pools: clusters of equal swing highs (buy side) or equal swing
//! lows (sell side), and whether price swept them shortly afterwards.

use tracing::debug;

use super::swing::{SwingKind, SwingPoint};
use crate::{Period, Ratio, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LiquiditySide {
    /// Resting above equal highs
    BuySide,
    /// Resting below equal lows
    SellSide,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LiquidityLevel {
    pub side: LiquiditySide,
    /// Mean price of the clustered swings
    pub level: f64,
    /// First and last swing bar of the cluster
    pub start_index: usize,
    pub end_index: usize,
    pub touches: usize,
    /// A bar in the sweep window wicked through the level and closed back
    pub swept: bool,
    pub swept_index: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidityDetector {
    /// Relative price difference still counted as "equal"
    pub tolerance: Ratio,
    /// Bars after the cluster checked for a sweep
    pub sweep_window: Period,
}

impl Default for LiquidityDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(0.001),
            sweep_window: Period::new_const(10),
        }
    }
}

impl LiquidityDetector {
    pub fn new(tolerance: Ratio, sweep_window: Period) -> Self {
        Self {
            tolerance,
            sweep_window,
        }
    }

    pub fn detect<T: OHLCV>(&self, bars: &[T], swings: &[SwingPoint]) -> Vec<LiquidityLevel> {
        let mut levels = self.side(bars, swings, LiquiditySide::BuySide);
        levels.extend(self.side(bars, swings, LiquiditySide::SellSide));
        levels.sort_by_key(|l| (l.end_index, l.start_index));

        debug!(
            levels = levels.len(),
            swept = levels.iter().filter(|l| l.swept).count(),
            "liquidity levels detected"
        );
        levels
    }

    fn side<T: OHLCV>(
        &self,
        bars: &[T],
        swings: &[SwingPoint],
        side: LiquiditySide,
    ) -> Vec<LiquidityLevel> {
        let kind = match side {
            LiquiditySide::BuySide => SwingKind::High,
            LiquiditySide::SellSide => SwingKind::Low,
        };
        let tol = self.tolerance.get();

        let mut levels = Vec::new();
        let mut cluster: Option<Cluster> = None;
        for swing in swings.iter().filter(|s| s.kind == kind) {
            match cluster.as_mut() {
                Some(c) if (swing.price - c.mean()).abs() <= tol * c.mean().abs() => c.add(swing),
                _ => {
                    if let Some(done) = cluster.take() {
                        levels.extend(self.finish(bars, done, side));
                    }
                    cluster = Some(Cluster::new(swing));
                },
            }
        }
        if let Some(done) = cluster {
            levels.extend(self.finish(bars, done, side));
        }
        levels
    }

    /// A cluster of one swing is not a pool
    fn finish<T: OHLCV>(&self, bars: &[T], c: Cluster, side: LiquiditySide) -> Option<LiquidityLevel> {
        if c.touches < 2 {
            return None;
        }
        let level = c.mean();
        let last = bars.len().min(c.end + 1 + self.sweep_window.get());
        let swept_index = (c.end + 1..last).find(|&i| {
            let bar = &bars[i];
            match side {
                LiquiditySide::BuySide => bar.high() > level && bar.close() < level,
                LiquiditySide::SellSide => bar.low() < level && bar.close() > level,
            }
        });

        Some(LiquidityLevel {
            side,
            level,
            start_index: c.start,
            end_index: c.end,
            touches: c.touches,
            swept: swept_index.is_some(),
            swept_index,
        })
    }
}

struct Cluster {
    start: usize,
    end: usize,
    sum: f64,
    touches: usize,
}

impl Cluster {
    fn new(swing: &SwingPoint) -> Self {
        Self {
            start: swing.index,
            end: swing.index,
            sum: swing.price,
            touches: 1,
        }
    }

    fn add(&mut self, swing: &SwingPoint) {
        self.end = swing.index;
        self.sum += swing.price;
        self.touches += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.touches as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Bar;

    fn swing(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            index,
            timestamp: index as i64,
            price,
            kind,
            confirmed: true,
        }
    }

    fn flat_bars(n: usize) -> Vec<Bar> {
        (0..n).map(|i| Bar::new(i as i64, 10.0, 10.5, 9.5, 10.0, 1.0)).collect()
    }

    #[test]
    fn test_equal_lows_form_sell_side_pool() {
        let swings = [
            swing(2, 12.0, SwingKind::High),
            swing(5, 9.0, SwingKind::Low),
            swing(8, 13.0, SwingKind::High),
            swing(11, 9.005, SwingKind::Low),
        ];
        let levels = LiquidityDetector::default().detect(&flat_bars(30), &swings);

        assert_eq!(levels.len(), 1);
        let pool = levels[0];
        assert_eq!(pool.side, LiquiditySide::SellSide);
        assert_eq!((pool.start_index, pool.end_index, pool.touches), (5, 11, 2));
        assert!((pool.level - 9.0025).abs() < 1e-12);
        assert!(!pool.swept);
    }

    #[test]
    fn test_sweep_wicks_through_and_closes_back() {
        let swings = [
            swing(2, 11.0, SwingKind::High),
            swing(5, 11.005, SwingKind::High),
        ];
        let mut bars = flat_bars(30);
        bars[9] = Bar::new(9, 10.8, 11.3, 10.7, 10.9, 1.0);

        let levels = LiquidityDetector::default().detect(&bars, &swings);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].side, LiquiditySide::BuySide);
        assert!(levels[0].swept);
        assert_eq!(levels[0].swept_index, Some(9));

        let narrow = LiquidityDetector::new(Ratio::new_const(0.001), Period::new_const(3));
        assert!(!narrow.detect(&bars, &swings)[0].swept);
    }

    #[test]
    fn test_distinct_highs_no_pool() {
        let swings = [
            swing(2, 11.0, SwingKind::High),
            swing(5, 11.5, SwingKind::High),
        ];
        assert!(LiquidityDetector::default().detect(&flat_bars(10), &swings).is_empty());
    }
}
