//! Long-only signal scoring and trade levels
//!
//! Six weighted dimensions, each worth at most its weight, add up to a
//! composite in [0, 100]:
//!
//! | dimension        | full credit when                                        |
//! |------------------|---------------------------------------------------------|
//! | zone match       | nearest bullish block sits in discount                  |
//! | trend match      | trend is bullish                                        |
//! | OB distance      | close is inside or below the nearest block's top        |
//! | OB overlap       | the block overlaps `overlap_cap` or more siblings       |
//! | FVG alignment    | an aligned bullish gap lies between block and close     |
//! | structure break  | the latest structure event is a bullish BOS             |
//!
//! Gating on the composite is left to [`crate::ranking::Ranker`].

use std::fmt;

use tracing::{debug, warn};

use crate::detectors::helpers::intervals_overlap;
use crate::detectors::{BreakKind, LiquiditySide, OrderBlock};
use crate::params::SmcConfig;
use crate::{Analysis, DataError, Direction, Trend, Zone};

// ============================================================
// SCORES
// ============================================================

/// Points earned per dimension, each in `0..=weight`
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct DimensionScores {
    pub zone_match: f64,
    pub trend_match: f64,
    pub ob_distance: f64,
    pub ob_overlap: f64,
    pub fvg_alignment: f64,
    pub structure_break: f64,
}

impl DimensionScores {
    #[inline]
    pub fn total(&self) -> f64 {
        self.zone_match
            + self.trend_match
            + self.ob_distance
            + self.ob_overlap
            + self.fvg_alignment
            + self.structure_break
    }
}

/// Non-fatal conditions met while scoring. Attached to the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DegenerateCase {
    /// No aligned bullish gap between block and close
    MissingFvgContext,
    /// The nearest block has top == bottom. Detected blocks are built from
    /// candles with a body, so only hand-built blocks reach this.
    ZeroRangeOrderBlock,
}

/// Dimension scores plus the block they were measured against
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub scores: DimensionScores,
    /// Sum of the dimensions, clamped to [0, 100]
    pub composite: f64,
    pub order_block: Option<OrderBlock>,
    pub warnings: Vec<DegenerateCase>,
}

/// Nearest unmitigated bullish block at or below `close`.
///
/// Distance is `max(0, close - top)`; ties prefer more overlaps, then the
/// more recent block.
pub fn nearest_order_block(blocks: &[OrderBlock], close: f64) -> Option<&OrderBlock> {
    blocks
        .iter()
        .filter(|b| b.direction == Direction::Bullish && !b.mitigated && b.bottom <= close)
        .min_by(|a, b| {
            let da = (close - a.top).max(0.0);
            let db = (close - b.top).max(0.0);
            da.total_cmp(&db)
                .then_with(|| b.overlap_count.cmp(&a.overlap_count))
                .then_with(|| b.end_index.cmp(&a.end_index))
        })
}

/// Score every dimension for the last bar of `analysis`
pub fn score_dimensions(analysis: &Analysis, config: &SmcConfig) -> ScoreCard {
    let w = &config.weights;
    let trend = analysis.trend();
    let close = analysis.last_bar().map_or(0.0, |b| b.close);
    let mut scores = DimensionScores::default();
    let mut warnings = Vec::new();

    if trend == Trend::Bullish {
        scores.trend_match = w.trend_match;
    }

    scores.structure_break = match analysis.structure.last_event() {
        Some(e) if e.direction == Direction::Bullish => match e.kind {
            BreakKind::Bos => w.structure_break,
            BreakKind::Choch => w.structure_break * config.choch_credit.get(),
        },
        _ => 0.0,
    };

    let order_block = nearest_order_block(&analysis.order_blocks, close).copied();
    if let Some(ob) = &order_block {
        scores.zone_match = match ob.zone {
            Zone::Discount => w.zone_match,
            Zone::Equilibrium => w.zone_match * config.equilibrium_credit.get(),
            Zone::Premium => 0.0,
        };

        if close > 0.0 {
            let distance = (close - ob.top).max(0.0) / close;
            scores.ob_distance = w.ob_distance * (1.0 - distance / config.max_ob_distance).max(0.0);
        }

        let cap = config.overlap_cap.get();
        scores.ob_overlap = w.ob_overlap * ob.overlap_count.min(cap) as f64 / cap as f64;

        let fvg_between = analysis
            .aligned_fvgs()
            .any(|g| g.direction == Direction::Bullish && intervals_overlap(g.bottom, g.top, ob.bottom, close));
        if fvg_between {
            scores.fvg_alignment = w.fvg_alignment;
        } else {
            warnings.push(DegenerateCase::MissingFvgContext);
        }

        if ob.height() <= 0.0 {
            warnings.push(DegenerateCase::ZeroRangeOrderBlock);
        }
    }

    ScoreCard {
        composite: scores.total().clamp(0.0, 100.0),
        scores,
        order_block,
        warnings,
    }
}

// ============================================================
// TRADE LEVELS
// ============================================================

/// Entry, ATR stop and R-multiple targets
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
}

impl TradeLevels {
    /// `stop = entry - atr * multiplier`, `target = entry + r * (entry - stop)`.
    /// None when the risk is not a positive finite number.
    pub fn derive(entry: f64, atr: f64, multiplier: f64, target1_r: f64, target2_r: f64) -> Option<Self> {
        let stop_loss = entry - atr * multiplier;
        let risk = entry - stop_loss;
        if !risk.is_finite() || risk <= 0.0 {
            return None;
        }
        Some(Self {
            entry,
            stop_loss,
            target1: entry + target1_r * risk,
            target2: entry + target2_r * risk,
        })
    }

    #[inline]
    pub fn risk(&self) -> f64 {
        self.entry - self.stop_loss
    }
}

/// Heuristic win-rate label picked by composite bracket. Not a fitted value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct WinRateRange {
    /// Percent
    pub low: f64,
    /// Percent
    pub high: f64,
}

impl WinRateRange {
    pub fn from_score(composite: f64) -> Self {
        let (low, high) = match composite {
            s if s >= 80.0 => (60.0, 70.0),
            s if s >= 60.0 => (50.0, 60.0),
            s if s >= 40.0 => (45.0, 55.0),
            _ => (35.0, 45.0),
        };
        Self { low, high }
    }
}

impl fmt::Display for WinRateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}-{:.0}%", self.low, self.high)
    }
}

// ============================================================
// OUTCOMES
// ============================================================

/// Long setup for one instrument, produced once per run
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Signal {
    pub symbol: String,
    pub name: String,
    pub composite_score: f64,
    pub scores: DimensionScores,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
    pub estimated_win_rate: WinRateRange,
    pub ob_overlap_count: usize,
    pub trend: Trend,
    /// Zone of the block the entry sits on
    pub zone: Zone,
    /// A sell-side pool was swept
    pub liquidity_sweep: bool,
    pub warnings: Vec<DegenerateCase>,
    /// Timestamp of the last analyzed bar
    pub generated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSignalReason {
    InsufficientData,
    MalformedData,
    NoOrderBlock,
    DegenerateRange,
}

impl NoSignalReason {
    pub fn code(self) -> &'static str {
        match self {
            NoSignalReason::InsufficientData => "insufficient_data",
            NoSignalReason::MalformedData => "malformed_data",
            NoSignalReason::NoOrderBlock => "no_order_block",
            NoSignalReason::DegenerateRange => "degenerate_range",
        }
    }
}

/// Why an instrument produced no signal
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NoSignal {
    pub symbol: String,
    pub name: String,
    pub reason: NoSignalReason,
    pub detail: String,
}

impl NoSignal {
    pub fn new(symbol: &str, name: &str, reason: NoSignalReason, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            reason,
            detail: detail.into(),
        }
    }

    pub fn from_data_error(symbol: &str, name: &str, error: &DataError) -> Self {
        let reason = match error {
            DataError::InsufficientData { .. } => NoSignalReason::InsufficientData,
            DataError::InvalidBar { .. } => NoSignalReason::MalformedData,
        };
        Self::new(symbol, name, reason, error.to_string())
    }
}

impl fmt::Display for NoSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: no signal - reason: {}", self.symbol, self.reason.code())
    }
}

/// Per-instrument result handed to report generation
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Signal(Signal),
    NoSignal(NoSignal),
}

impl Outcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Outcome::Signal(s) => Some(s),
            Outcome::NoSignal(_) => None,
        }
    }

    pub fn no_signal(&self) -> Option<&NoSignal> {
        match self {
            Outcome::Signal(_) => None,
            Outcome::NoSignal(n) => Some(n),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Outcome::Signal(s) => &s.symbol,
            Outcome::NoSignal(n) => &n.symbol,
        }
    }
}

// ============================================================
// EVALUATION
// ============================================================

/// Score the analysis and derive trade levels from the nearest bullish block.
pub fn evaluate(analysis: &Analysis, name: &str, config: &SmcConfig) -> Outcome {
    let symbol = analysis.symbol.as_str();
    let Some(last) = analysis.last_bar() else {
        return Outcome::NoSignal(NoSignal::new(symbol, name, NoSignalReason::InsufficientData, "empty series"));
    };

    let card = score_dimensions(analysis, config);
    let Some(ob) = card.order_block else {
        debug!(symbol, close = last.close, "no unmitigated bullish order block");
        return Outcome::NoSignal(NoSignal::new(
            symbol,
            name,
            NoSignalReason::NoOrderBlock,
            format!("no unmitigated bullish order block at or below close {}", last.close),
        ));
    };

    for case in &card.warnings {
        match case {
            DegenerateCase::MissingFvgContext => debug!(symbol, "no aligned gap between block and close"),
            DegenerateCase::ZeroRangeOrderBlock => warn!(symbol, case = ?case, "degenerate scoring context"),
        }
    }

    let Some(levels) = TradeLevels::derive(
        ob.bottom,
        analysis.atr,
        config.atr_multiplier,
        config.target1_r,
        config.target2_r,
    ) else {
        warn!(symbol, entry = ob.bottom, atr = analysis.atr, "zero risk range, no targets");
        return Outcome::NoSignal(NoSignal::new(
            symbol,
            name,
            NoSignalReason::DegenerateRange,
            format!("entry {} equals stop (atr {})", ob.bottom, analysis.atr),
        ));
    };

    let liquidity_sweep = analysis
        .liquidity
        .iter()
        .any(|l| l.side == LiquiditySide::SellSide && l.swept);

    Outcome::Signal(Signal {
        symbol: symbol.to_string(),
        name: name.to_string(),
        composite_score: card.composite,
        scores: card.scores,
        entry_price: levels.entry,
        stop_loss: levels.stop_loss,
        target1: levels.target1,
        target2: levels.target2,
        estimated_win_rate: WinRateRange::from_score(card.composite),
        ob_overlap_count: ob.overlap_count,
        trend: analysis.trend(),
        zone: ob.zone,
        liquidity_sweep,
        warnings: card.warnings,
        generated_at: last.timestamp,
    })
}

// ============================================================
// TESTS
// ============================================================
