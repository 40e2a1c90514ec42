//! # YASMC - Yet Another Smart Money Concepts scanner
//!
//! Market-structure analysis and long-only signal scoring over daily bars:
//! swing points, BOS/CHoCH events, order blocks, fair value gaps and
//! liquidity pools, combined into a weighted 0-100 composite score with
//! ATR-based trade levels.
//!
//! ## Quick Start
//!
//! ```rust
//! use yasmc::prelude::*;
//!
//! // Define your OHLCV data
//! struct Row { t: i64, o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Row {
//!     fn timestamp(&self) -> i64 { self.t }
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! // Configuration is validated once, at build time
//! let engine = EngineBuilder::new()
//!     .swing_length(5)
//!     .atr_multiplier(1.5)
//!     .build()
//!     .unwrap();
//!
//! // Too few bars: the instrument is reported, not dropped
//! let rows: Vec<Row> = vec![];
//! let outcome = engine.evaluate("AAPL", "Apple Inc.", &rows);
//! assert!(outcome.signal().is_none());
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

pub mod bars;
pub mod detectors;
pub mod params;
pub mod ranking;
pub mod scoring;

pub mod prelude {
    pub use crate::{
        // Parallel
        analyze_universe,
        // Bars
        bars::{normalize, Bar},
        // Detectors
        detectors::*,
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, ScoreWeights, SmcConfig, ZoneThresholds},
        // Ranking
        ranking::{rank, Ranker},
        // Scoring
        scoring::{
            DegenerateCase, DimensionScores, NoSignal, NoSignalReason, Outcome, ScoreCard, Signal,
            TradeLevels, WinRateRange,
        },
        Analysis,
        ConfigError,
        DataError,
        Direction,
        EngineBuilder,
        Instrument,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        SmcEngine,
        SmcError,
        Trend,
        UniverseReport,
        Zone,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T, E = SmcError> = std::result::Result<T, E>;

/// Per-instrument data problems. The instrument is excluded, the batch goes on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at timestamp {timestamp}: {reason}")]
    InvalidBar { timestamp: i64, reason: &'static str },
}

/// Configuration problems. Fatal before any instrument is analyzed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Scoring weights sum to {sum}, expected 100")]
    WeightSum { sum: f64 },

    #[error("Zone thresholds must satisfy discount < premium, got {discount} / {premium}")]
    InvalidThresholds { discount: f64, premium: f64 },

    #[error("Unknown parameter: {0}")]
    UnknownParam(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Any error the crate can produce
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SmcError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    /// Bar time, any monotonic integer clock (epoch seconds, days, ...)
    fn timestamp(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl<B: OHLCV + ?Sized> OHLCV for &B {
    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// All numeric fields are finite
    #[inline]
    fn is_finite(&self) -> bool {
        self.open().is_finite()
            && self.high().is_finite()
            && self.low().is_finite()
            && self.close().is_finite()
            && self.volume().is_finite()
    }

    /// Validate price consistency of a finite bar
    fn validate(&self) -> Result<(), DataError> {
        let reason = if self.high() < self.low() {
            "high < low"
        } else if !(self.low()..=self.high()).contains(&self.open()) {
            "open outside [low, high]"
        } else if !(self.low()..=self.high()).contains(&self.close()) {
            "close outside [low, high]"
        } else if self.volume() < 0.0 {
            "negative volume"
        } else {
            return Ok(());
        };
        Err(DataError::InvalidBar {
            timestamp: self.timestamp(),
            reason,
        })
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

// ============================================================
// MARKET STRUCTURE TYPES
// ============================================================

/// Direction of a break, block or gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Prevailing trend derived from confirmed swings and structure breaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Ranging,
}

impl Trend {
    /// The direction this trend follows, `None` while ranging
    #[inline]
    pub fn direction(self) -> Option<Direction> {
        match self {
            Trend::Bullish => Some(Direction::Bullish),
            Trend::Bearish => Some(Direction::Bearish),
            Trend::Ranging => None,
        }
    }
}

impl From<Direction> for Trend {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => Trend::Bullish,
            Direction::Bearish => Trend::Bearish,
        }
    }
}

/// Position of a price inside the active swing range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Zone {
    Discount,
    Equilibrium,
    Premium,
}

// ============================================================
// ANALYSIS
// ============================================================

use bars::Bar;
use detectors::{
    aligned_fvgs, atr, FairValueGap, FvgDetector, LiquidityDetector, LiquidityLevel,
    OrderBlock, OrderBlockDetector, SwingDetector, SwingStructure,
};
use params::SmcConfig;
use ranking::Ranker;
use scoring::{NoSignal, Outcome, Signal};

/// Everything derived from one instrument's bars.
///
/// Handed to overlay renderers as is; every entity carries its bar index and
/// timestamp.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Analysis {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub structure: SwingStructure,
    pub order_blocks: Vec<OrderBlock>,
    pub fvgs: Vec<FairValueGap>,
    pub liquidity: Vec<LiquidityLevel>,
    /// Trailing average true range at the last bar
    pub atr: f64,
}

impl Analysis {
    #[inline]
    pub fn trend(&self) -> Trend {
        self.structure.trend
    }

    #[inline]
    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Unfilled gaps whose direction matches the final trend
    pub fn aligned_fvgs(&self) -> impl Iterator<Item = &FairValueGap> {
        aligned_fvgs(&self.fvgs, self.trend())
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Runs the per-instrument pipeline against one validated configuration
#[derive(Debug, Clone)]
pub struct SmcEngine {
    config: SmcConfig,
}

impl SmcEngine {
    pub fn new(config: SmcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &SmcConfig {
        &self.config
    }

    /// Normalize the bars and run every detector over them.
    pub fn analyze<T: OHLCV>(&self, symbol: &str, bars: &[T]) -> Result<Analysis, DataError> {
        let cfg = &self.config;
        let bars = bars::normalize(bars, cfg.swing_length)?;

        let structure = SwingDetector::new(cfg.swing_length).detect(&bars);
        let order_blocks = OrderBlockDetector::new(cfg.zones).detect(&bars, &structure.events);
        let fvgs = FvgDetector.detect(&bars);
        let liquidity = LiquidityDetector::new(cfg.liquidity_tolerance, cfg.sweep_window)
            .detect(&bars, &structure.swings);
        let atr = atr(&bars, cfg.atr_period);

        debug!(
            symbol,
            bars = bars.len(),
            swings = structure.swings.len(),
            events = structure.events.len(),
            order_blocks = order_blocks.len(),
            fvgs = fvgs.len(),
            liquidity = liquidity.len(),
            trend = ?structure.trend,
            "analysis complete"
        );

        Ok(Analysis {
            symbol: symbol.to_string(),
            bars,
            structure,
            order_blocks,
            fvgs,
            liquidity,
            atr,
        })
    }

    /// Full pipeline for one instrument. Data errors become `NoSignal`.
    pub fn evaluate<T: OHLCV>(&self, symbol: &str, name: &str, bars: &[T]) -> Outcome {
        match self.analyze(symbol, bars) {
            Ok(analysis) => scoring::evaluate(&analysis, name, &self.config),
            Err(error) => {
                warn!(symbol, error = %error, "instrument excluded");
                Outcome::NoSignal(NoSignal::from_data_error(symbol, name, &error))
            },
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SmcEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: SmcConfig,
    swing_length: Option<usize>,
    atr_period: Option<usize>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SmcConfig) -> Self {
        self.config = config;
        self
    }

    /// Look-back/look-forward window for swing confirmation
    pub fn swing_length(mut self, bars: usize) -> Self {
        self.swing_length = Some(bars);
        self
    }

    /// Trailing window for the stop-loss ATR
    pub fn atr_period(mut self, bars: usize) -> Self {
        self.atr_period = Some(bars);
        self
    }

    /// ATR buffer below the entry
    pub fn atr_multiplier(mut self, multiplier: f64) -> Self {
        self.config.atr_multiplier = multiplier;
        self
    }

    /// R-multiples for the two targets
    pub fn targets(mut self, target1_r: f64, target2_r: f64) -> Self {
        self.config.target1_r = target1_r;
        self.config.target2_r = target2_r;
        self
    }

    pub fn weights(mut self, weights: params::ScoreWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn zones(mut self, zones: params::ZoneThresholds) -> Self {
        self.config.zones = zones;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SmcEngine, ConfigError> {
        let mut config = self.config;
        if let Some(len) = self.swing_length {
            config.swing_length = Period::new(len)?;
        }
        if let Some(len) = self.atr_period {
            config.atr_period = Period::new(len)?;
        }
        SmcEngine::new(config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// One member of the universe
#[derive(Debug, Clone, Copy)]
pub struct Instrument<'a, T> {
    pub symbol: &'a str,
    pub name: &'a str,
    pub bars: &'a [T],
}

impl<'a, T> Instrument<'a, T> {
    pub fn new(symbol: &'a str, name: &'a str, bars: &'a [T]) -> Self {
        Self { symbol, name, bars }
    }
}

/// Outcome of every instrument, keyed by symbol
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct UniverseReport {
    pub outcomes: BTreeMap<String, Outcome>,
}

impl UniverseReport {
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.outcomes.values().filter_map(Outcome::signal)
    }

    pub fn no_signals(&self) -> impl Iterator<Item = &NoSignal> {
        self.outcomes.values().filter_map(Outcome::no_signal)
    }

    /// Signals in ranked order after the ranker's gates
    pub fn ranked(&self, ranker: &Ranker) -> Vec<Signal> {
        ranker.apply(self.signals().cloned().collect())
    }
}

/// Evaluate every instrument on the rayon pool and join the results.
///
/// A failing instrument is reported as `NoSignal` and never affects its
/// siblings. Duplicate symbols keep the last instrument in input order.
pub fn analyze_universe<'a, T, I>(engine: &SmcEngine, instruments: I) -> UniverseReport
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = Instrument<'a, T>>,
{
    let results: Vec<(String, Outcome)> = instruments
        .into_par_iter()
        .map(|inst| {
            let outcome = engine.evaluate(inst.symbol, inst.name, inst.bars);
            (inst.symbol.to_string(), outcome)
        })
        .collect();

    let report = UniverseReport {
        outcomes: results.into_iter().collect(),
    };

    info!(
        instruments = report.outcomes.len(),
        signals = report.signals().count(),
        "universe analysis complete"
    );

    report
}

// ============================================================
// TESTS
// ============================================================
