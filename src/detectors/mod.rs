//! Market structure detectors
//!
//! Each detector is a small configuration struct with a `detect` method that
//! performs one linear scan over a normalized series.
//!
//! # Detectors
//!
//! - **Swing**: confirmed swing highs/lows, trend state, BOS/CHoCH events
//! - **Order block**: last opposing candle run before each structure break
//! - **Fair value gap**: three-bar imbalances and their fill state
//! - **Liquidity**: equal highs/lows pools and their sweeps

pub mod helpers;

pub mod fvg;
pub mod liquidity;
pub mod order_block;
pub mod swing;

// Re-export all detectors for convenience
pub use fvg::*;
pub use helpers::*;
pub use liquidity::*;
pub use order_block::*;
pub use swing::*;
