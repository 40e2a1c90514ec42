//! Swing points, trend state and structure breaks
//!
//! A bar is a swing HIGH candidate when its high is the maximum of the window
//! `[i - L, i + L]`: strictly above every earlier bar and at least as high as
//! every later one, so a flat top resolves to its first bar. Swing LOWs are
//! symmetric. Candidates need the full look-back and are confirmed `L` bars
//! later, when the look-forward half of the window has printed.
//!
//! Confirmed swings, trend and breaks are produced by a single walk in time
//! order, so an event at bar `t` only depends on bars `0..=t`.

use tracing::debug;

use crate::{Direction, Period, Trend, OHLCV};

// ============================================================
// TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::High => SwingKind::Low,
            SwingKind::Low => SwingKind::High,
        }
    }
}

/// Local price extremum
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SwingPoint {
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub kind: SwingKind,
    /// False for tail candidates whose look-forward window is incomplete
    pub confirmed: bool,
}

impl SwingPoint {
    /// Higher high, or lower low
    #[inline]
    pub fn is_more_extreme_than(&self, other: &SwingPoint) -> bool {
        match self.kind {
            SwingKind::High => self.price > other.price,
            SwingKind::Low => self.price < other.price,
        }
    }
}

/// Break of structure (with the trend) or change of character (against it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BreakKind {
    Bos,
    Choch,
}

/// Closed price interval
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

/// A close beyond the latest opposing swing level
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct StructureEvent {
    /// Bar whose close broke the level
    pub index: usize,
    pub timestamp: i64,
    pub kind: BreakKind,
    pub direction: Direction,
    pub broken_swing: SwingPoint,
    pub level: f64,
    /// Latest swing low to latest swing high when the break happened
    pub active_range: PriceRange,
}

/// Output of [`SwingDetector::detect`]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SwingStructure {
    /// Confirmed swings, kinds strictly alternating
    pub swings: Vec<SwingPoint>,
    /// Candidates in the last `L` bars, not yet confirmable
    pub provisional: Vec<SwingPoint>,
    pub events: Vec<StructureEvent>,
    /// Trend after the last bar
    pub trend: Trend,
}

impl SwingStructure {
    #[inline]
    pub fn last_event(&self) -> Option<&StructureEvent> {
        self.events.last()
    }

    /// Most recent confirmed swing of `kind`
    pub fn latest(&self, kind: SwingKind) -> Option<&SwingPoint> {
        self.swings.iter().rev().find(|s| s.kind == kind)
    }

    pub fn count(&self, kind: BreakKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

// ============================================================
// DETECTOR
// ============================================================

#[derive(Debug, Clone, Copy)]
pub struct SwingDetector {
    pub swing_length: Period,
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self {
            swing_length: Period::new_const(50),
        }
    }
}

impl SwingDetector {
    pub fn new(swing_length: Period) -> Self {
        Self { swing_length }
    }

    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> SwingStructure {
        let len = self.swing_length.get();
        let n = bars.len();
        let mut walk = StructureWalk::default();

        for t in 0..n {
            // The candidate at t - len has just completed its window.
            if let Some(i) = t.checked_sub(len).filter(|&i| i >= len) {
                if let Some(kind) = candidate_kind(bars, i, len, walk.last_kind()) {
                    walk.push(point(bars, i, kind, true));
                }
            }
            walk.check_breaks(bars, t);
        }

        let mut provisional: Vec<SwingPoint> = Vec::new();
        for i in len.max(n.saturating_sub(len))..n {
            let last_kind = provisional.last().map(|p| p.kind).or_else(|| walk.last_kind());
            if let Some(kind) = candidate_kind(bars, i, len, last_kind) {
                provisional.push(point(bars, i, kind, false));
            }
        }

        debug!(
            swings = walk.swings.len(),
            provisional = provisional.len(),
            events = walk.events.len(),
            trend = ?walk.trend,
            "swing structure detected"
        );

        SwingStructure {
            swings: walk.swings,
            provisional,
            events: walk.events,
            trend: walk.trend,
        }
    }
}

fn point<T: OHLCV>(bars: &[T], i: usize, kind: SwingKind, confirmed: bool) -> SwingPoint {
    let price = match kind {
        SwingKind::High => bars[i].high(),
        SwingKind::Low => bars[i].low(),
    };
    SwingPoint {
        index: i,
        timestamp: bars[i].timestamp(),
        price,
        kind,
        confirmed,
    }
}

/// Swing kind of bar `i`, if any. The look-forward side is truncated at the
/// end of the series. An outside bar qualifying as both takes the kind that
/// continues the alternation, HIGH when there is nothing to alternate with.
fn candidate_kind<T: OHLCV>(
    bars: &[T],
    i: usize,
    len: usize,
    last_kind: Option<SwingKind>,
) -> Option<SwingKind> {
    let before = &bars[i - len..i];
    let after = &bars[i + 1..bars.len().min(i + len + 1)];

    let h = bars[i].high();
    let is_high = before.iter().all(|b| b.high() < h) && after.iter().all(|b| b.high() <= h);
    let l = bars[i].low();
    let is_low = before.iter().all(|b| b.low() > l) && after.iter().all(|b| b.low() >= l);

    match (is_high, is_low) {
        (true, true) => Some(last_kind.map_or(SwingKind::High, SwingKind::opposite)),
        (true, false) => Some(SwingKind::High),
        (false, true) => Some(SwingKind::Low),
        (false, false) => None,
    }
}

// ============================================================
// STRUCTURE WALK
// ============================================================

#[derive(Debug, Default)]
struct StructureWalk {
    swings: Vec<SwingPoint>,
    events: Vec<StructureEvent>,
    trend: Trend,
    /// Bar index of the last swing high / low already broken
    broken_high: Option<usize>,
    broken_low: Option<usize>,
}

impl StructureWalk {
    fn last_kind(&self) -> Option<SwingKind> {
        self.swings.last().map(|s| s.kind)
    }

    fn latest(&self, kind: SwingKind) -> Option<SwingPoint> {
        self.swings.iter().rev().find(|s| s.kind == kind).copied()
    }

    /// Append keeping strict alternation: a same-kind successor replaces the
    /// previous swing only when it is more extreme.
    fn push(&mut self, swing: SwingPoint) {
        match self.swings.last_mut() {
            Some(last) if last.kind == swing.kind => {
                if !swing.is_more_extreme_than(last) {
                    return;
                }
                *last = swing;
            },
            _ => self.swings.push(swing),
        }
        self.update_trend();
    }

    /// HH + HL is bullish, LH + LL bearish, anything else ranging. Needs two
    /// swings of each kind; until then the trend is left alone.
    fn update_trend(&mut self) {
        let mut highs = self.swings.iter().rev().filter(|s| s.kind == SwingKind::High);
        let mut lows = self.swings.iter().rev().filter(|s| s.kind == SwingKind::Low);
        let (Some(h1), Some(h0), Some(l1), Some(l0)) =
            (highs.next(), highs.next(), lows.next(), lows.next())
        else {
            return;
        };

        self.trend = if h1.price > h0.price && l1.price > l0.price {
            Trend::Bullish
        } else if h1.price < h0.price && l1.price < l0.price {
            Trend::Bearish
        } else {
            Trend::Ranging
        };
    }

    fn check_breaks<T: OHLCV>(&mut self, bars: &[T], t: usize) {
        if self.swings.len() < 2 {
            return;
        }
        let close = bars[t].close();

        if let Some(high) = self.latest(SwingKind::High) {
            if self.broken_high != Some(high.index) && close > high.price {
                self.broken_high = Some(high.index);
                self.record(bars, t, high, Direction::Bullish);
            }
        }
        if let Some(low) = self.latest(SwingKind::Low) {
            if self.broken_low != Some(low.index) && close < low.price {
                self.broken_low = Some(low.index);
                self.record(bars, t, low, Direction::Bearish);
            }
        }
    }

    fn record<T: OHLCV>(&mut self, bars: &[T], t: usize, broken: SwingPoint, direction: Direction) {
        let (Some(low), Some(high)) = (self.latest(SwingKind::Low), self.latest(SwingKind::High))
        else {
            return;
        };

        let kind = match self.trend.direction() {
            Some(d) if d != direction => BreakKind::Choch,
            _ => BreakKind::Bos,
        };
        self.trend = Trend::from(direction);

        self.events.push(StructureEvent {
            index: t,
            timestamp: bars[t].timestamp(),
            kind,
            direction,
            broken_swing: broken,
            level: broken.price,
            active_range: PriceRange {
                low: low.price,
                high: high.price,
            },
        });
    }
}

// ============================================================
// TESTS
// ============================================================
