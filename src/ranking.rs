//! Universe-wide ordering of signals
//!
//! Total order: composite score descending, then overlap count descending,
//! then symbol ascending. Score gates and the top-N cut are ranking-stage
//! policy and live in [`Ranker`].

use std::cmp::Ordering;

use crate::scoring::Signal;

/// Comparator behind [`rank`]
pub fn compare(a: &Signal, b: &Signal) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| b.ob_overlap_count.cmp(&a.ob_overlap_count))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Sort signals into ranked order
pub fn rank(signals: &mut [Signal]) {
    signals.sort_by(compare);
}

/// Ranking with optional score gate and top-N cut
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ranker {
    pub min_score: Option<f64>,
    pub top_n: Option<usize>,
}

impl Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop signals scoring below `score`
    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = Some(score);
        self
    }

    /// Keep the best `n` signals
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn apply(&self, mut signals: Vec<Signal>) -> Vec<Signal> {
        if let Some(min) = self.min_score {
            signals.retain(|s| s.composite_score >= min);
        }
        rank(&mut signals);
        if let Some(n) = self.top_n {
            signals.truncate(n);
        }
        signals
    }
}
