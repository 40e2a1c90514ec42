//! Scanner configuration and parameter metadata
//!
//! [`SmcConfig`] is the single validated configuration value shared by every
//! instrument in a run. It deserializes with defaults for missing keys, and
//! flat overrides can be applied from a `HashMap<&str, f64>` checked against
//! the [`PARAMS`] metadata table.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use yasmc::params::{SmcConfig, PARAMS};
//!
//! for param in PARAMS {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let overrides = HashMap::from([("swing_length", 20.0), ("atr_multiplier", 2.0)]);
//! let config = SmcConfig::default().with_params(&overrides).unwrap();
//! assert_eq!(config.swing_length.get(), 20);
//! ```

use std::collections::HashMap;

use crate::{ConfigError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Unbounded real value, limited only by the metadata range
  Float,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "swing_length")
  pub name: &'static str,
  /// Parameter type
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Accepted override values: (min, max), inclusive
  pub range: (f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Ratio parameter
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Create a new ParamMeta for a Period parameter
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Create a new ParamMeta for a Float parameter
  pub const fn float(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Float, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
      return Err(ConfigError::InvalidValue("parameter cannot be NaN or infinite"));
    }
    let (min, max) = self.range;
    if value < min || value > max {
      return Err(ConfigError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Float => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(ConfigError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

/// Every key accepted by [`SmcConfig::with_params`].
///
/// Ranges bound the values an override may take. Any positive period is
/// valid up to the sanity limit.
pub const PARAMS: &[ParamMeta] = &[
  ParamMeta::period("swing_length", 50.0, (1.0, 1000.0), "Swing confirmation window"),
  ParamMeta::period("atr_period", 14.0, (1.0, 1000.0), "Trailing ATR window"),
  ParamMeta::float("atr_multiplier", 1.5, (0.01, 20.0), "Stop buffer in ATRs below entry"),
  ParamMeta::float("target1_r", 2.0, (0.1, 50.0), "First target in R-multiples"),
  ParamMeta::float("target2_r", 3.0, (0.1, 50.0), "Second target in R-multiples"),
  ParamMeta::float("weight_zone_match", 25.0, (0.0, 100.0), "Zone-match weight"),
  ParamMeta::float("weight_trend_match", 20.0, (0.0, 100.0), "Trend-match weight"),
  ParamMeta::float("weight_ob_distance", 20.0, (0.0, 100.0), "OB-distance weight"),
  ParamMeta::float("weight_ob_overlap", 15.0, (0.0, 100.0), "OB-overlap weight"),
  ParamMeta::float("weight_fvg_alignment", 10.0, (0.0, 100.0), "FVG-alignment weight"),
  ParamMeta::float("weight_structure_break", 10.0, (0.0, 100.0), "Structure-break weight"),
  ParamMeta::ratio(
    "discount_threshold",
    1.0 / 3.0,
    (0.0, 1.0),
    "Range position below which a block is in discount",
  ),
  ParamMeta::ratio(
    "premium_threshold",
    2.0 / 3.0,
    (0.0, 1.0),
    "Range position above which a block is in premium",
  ),
  ParamMeta::ratio("equilibrium_credit", 0.4, (0.0, 1.0), "Zone credit for equilibrium"),
  ParamMeta::ratio("choch_credit", 0.5, (0.0, 1.0), "Structure credit for a bullish CHoCH"),
  ParamMeta::period("overlap_cap", 2.0, (1.0, 100.0), "Overlap count earning full credit"),
  ParamMeta::float(
    "max_ob_distance",
    0.20,
    (0.001, 1.0),
    "Relative distance above the block where distance credit reaches zero",
  ),
  ParamMeta::ratio("liquidity_tolerance", 0.001, (0.0, 0.1), "Relative tolerance for equal highs/lows"),
  ParamMeta::period("sweep_window", 10.0, (1.0, 1000.0), "Bars after a pool checked for a sweep"),
];

// ============================================================
// CONFIGURATION
// ============================================================

/// Weights of the six scoring dimensions. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
  pub zone_match: f64,
  pub trend_match: f64,
  pub ob_distance: f64,
  pub ob_overlap: f64,
  pub fvg_alignment: f64,
  pub structure_break: f64,
}

impl Default for ScoreWeights {
  fn default() -> Self {
    Self {
      zone_match: 25.0,
      trend_match: 20.0,
      ob_distance: 20.0,
      ob_overlap: 15.0,
      fvg_alignment: 10.0,
      structure_break: 10.0,
    }
  }
}

impl ScoreWeights {
  #[inline]
  pub fn sum(&self) -> f64 {
    self.zone_match
      + self.trend_match
      + self.ob_distance
      + self.ob_overlap
      + self.fvg_alignment
      + self.structure_break
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let all = [
      self.zone_match,
      self.trend_match,
      self.ob_distance,
      self.ob_overlap,
      self.fvg_alignment,
      self.structure_break,
    ];
    if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
      return Err(ConfigError::InvalidValue("scoring weights must be finite and >= 0"));
    }
    let sum = self.sum();
    if (sum - 100.0).abs() > 1e-9 {
      return Err(ConfigError::WeightSum { sum });
    }
    Ok(())
  }
}

/// Range-position boundaries between discount, equilibrium and premium
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ZoneThresholds {
  pub discount: Ratio,
  pub premium: Ratio,
}

impl Default for ZoneThresholds {
  fn default() -> Self {
    Self { discount: Ratio::new_const(1.0 / 3.0), premium: Ratio::new_const(2.0 / 3.0) }
  }
}

impl ZoneThresholds {
  pub fn new(discount: f64, premium: f64) -> Result<Self, ConfigError> {
    let zones = Self { discount: Ratio::new(discount)?, premium: Ratio::new(premium)? };
    zones.validate()?;
    Ok(zones)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.discount.get() >= self.premium.get() {
      return Err(ConfigError::InvalidThresholds {
        discount: self.discount.get(),
        premium: self.premium.get(),
      });
    }
    Ok(())
  }
}

/// Validated scanner configuration, built once per run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SmcConfig {
  /// Look-back/look-forward window for swing confirmation
  pub swing_length: Period,
  /// Trailing window of the stop-loss ATR
  pub atr_period: Period,
  /// Stop distance below entry, in ATRs
  pub atr_multiplier: f64,
  pub target1_r: f64,
  pub target2_r: f64,
  pub weights: ScoreWeights,
  pub zones: ZoneThresholds,
  /// Share of the zone weight earned by an equilibrium block
  pub equilibrium_credit: Ratio,
  /// Share of the structure weight earned by a bullish CHoCH
  pub choch_credit: Ratio,
  /// Overlap count at which the overlap dimension saturates
  pub overlap_cap: Period,
  /// Relative distance above a block at which distance credit reaches zero
  pub max_ob_distance: f64,
  pub liquidity_tolerance: Ratio,
  pub sweep_window: Period,
}

impl Default for SmcConfig {
  fn default() -> Self {
    Self {
      swing_length: Period::new_const(50),
      atr_period: Period::new_const(14),
      atr_multiplier: 1.5,
      target1_r: 2.0,
      target2_r: 3.0,
      weights: ScoreWeights::default(),
      zones: ZoneThresholds::default(),
      equilibrium_credit: Ratio::new_const(0.4),
      choch_credit: Ratio::new_const(0.5),
      overlap_cap: Period::new_const(2),
      max_ob_distance: 0.20,
      liquidity_tolerance: Ratio::new_const(0.001),
      sweep_window: Period::new_const(10),
    }
  }
}

impl SmcConfig {
  /// Cross-field validation. Single-field ranges are enforced by the types.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.weights.validate()?;
    self.zones.validate()?;
    if !self.atr_multiplier.is_finite() || self.atr_multiplier <= 0.0 {
      return Err(ConfigError::InvalidValue("atr_multiplier must be positive"));
    }
    if !self.max_ob_distance.is_finite() || self.max_ob_distance <= 0.0 {
      return Err(ConfigError::InvalidValue("max_ob_distance must be positive"));
    }
    if !self.target1_r.is_finite() || self.target1_r <= 0.0 {
      return Err(ConfigError::InvalidValue("target1_r must be positive"));
    }
    if !self.target2_r.is_finite() || self.target2_r <= self.target1_r {
      return Err(ConfigError::InvalidConfig(format!(
        "target2_r ({}) must exceed target1_r ({})",
        self.target2_r, self.target1_r
      )));
    }
    Ok(())
  }

  /// Apply flat overrides on top of this configuration.
  ///
  /// Keys must appear in [`PARAMS`]; missing keys keep their current value.
  pub fn with_params(&self, params: &HashMap<&str, f64>) -> Result<Self, ConfigError> {
    for (key, value) in params {
      let meta = PARAMS
        .iter()
        .find(|m| m.name == *key)
        .ok_or_else(|| ConfigError::UnknownParam(key.to_string()))?;
      meta.validate(*value)?;
    }

    let w = &self.weights;
    let config = Self {
      swing_length: get_period(params, "swing_length", self.swing_length.get())?,
      atr_period: get_period(params, "atr_period", self.atr_period.get())?,
      atr_multiplier: get_float(params, "atr_multiplier", self.atr_multiplier),
      target1_r: get_float(params, "target1_r", self.target1_r),
      target2_r: get_float(params, "target2_r", self.target2_r),
      weights: ScoreWeights {
        zone_match: get_float(params, "weight_zone_match", w.zone_match),
        trend_match: get_float(params, "weight_trend_match", w.trend_match),
        ob_distance: get_float(params, "weight_ob_distance", w.ob_distance),
        ob_overlap: get_float(params, "weight_ob_overlap", w.ob_overlap),
        fvg_alignment: get_float(params, "weight_fvg_alignment", w.fvg_alignment),
        structure_break: get_float(params, "weight_structure_break", w.structure_break),
      },
      zones: ZoneThresholds {
        discount: get_ratio(params, "discount_threshold", self.zones.discount.get())?,
        premium: get_ratio(params, "premium_threshold", self.zones.premium.get())?,
      },
      equilibrium_credit: get_ratio(params, "equilibrium_credit", self.equilibrium_credit.get())?,
      choch_credit: get_ratio(params, "choch_credit", self.choch_credit.get())?,
      overlap_cap: get_period(params, "overlap_cap", self.overlap_cap.get())?,
      max_ob_distance: get_float(params, "max_ob_distance", self.max_ob_distance),
      liquidity_tolerance: get_ratio(
        params,
        "liquidity_tolerance",
        self.liquidity_tolerance.get(),
      )?,
      sweep_window: get_period(params, "sweep_window", self.sweep_window.get())?,
    };
    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio, ConfigError> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(
  params: &HashMap<&str, f64>,
  key: &str,
  default: usize,
) -> Result<Period, ConfigError> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

fn get_float(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

// ============================================================
// TESTS
// ============================================================
