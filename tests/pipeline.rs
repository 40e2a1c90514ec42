//! Integration tests for the YASMC analysis pipeline.
//!
//! These tests drive the public API end to end: normalization, structure,
//! order blocks, gaps, scoring and universe ranking.

use yasmc::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(t: i64, o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { t, o, h, l, c }
    }
}

impl OHLCV for TestBar {
    fn timestamp(&self) -> i64 {
        self.t
    }

    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

/// Rising zigzag: 50 bars up by 1.0, 50 bars down by 0.8, repeated.
/// Each leg ends on a swing that is the extreme of a 101-bar window.
fn make_rising_zigzag(n: usize, base: f64) -> Vec<TestBar> {
    let mut close = base;
    (0..n)
        .map(|i| {
            let rising = i % 100 < 50;
            if i > 0 {
                close += if rising { 1.0 } else { -0.8 };
            }
            let open = if rising { close - 0.5 } else { close + 0.4 };
            TestBar::new(i as i64, open, open.max(close) + 0.1, open.min(close) - 0.1, close)
        })
        .collect()
}

fn engine(swing_length: usize) -> SmcEngine {
    EngineBuilder::new().swing_length(swing_length).build().unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ============================================================
// STRUCTURE
// ============================================================

#[test]
fn test_monotonic_rise_has_no_structure() {
    // Every bar has a higher high after it and a lower low before it.
    let bars: Vec<TestBar> = (0..300)
        .map(|i| {
            let c = 100.0 + i as f64;
            TestBar::new(i as i64, c - 0.5, c + 0.1, c - 0.6, c)
        })
        .collect();
    let analysis = engine(50).analyze("MONO", &bars).unwrap();
    let structure = &analysis.structure;

    assert!(structure.swings.is_empty());
    assert!(structure.events.is_empty());
    assert_eq!(structure.count(BreakKind::Choch), 0);
    assert_eq!(structure.trend, Trend::Ranging);
    assert!(analysis.order_blocks.is_empty());

    let tail: Vec<(usize, SwingKind, bool)> =
        structure.provisional.iter().map(|s| (s.index, s.kind, s.confirmed)).collect();
    assert_eq!(tail, vec![(299, SwingKind::High, false)]);
}

#[test]
fn test_rising_zigzag_is_bullish_without_choch() {
    let bars = make_rising_zigzag(300, 100.0);
    let analysis = engine(50).analyze("RISE", &bars).unwrap();
    let structure = &analysis.structure;

    let swings: Vec<(usize, SwingKind)> = structure.swings.iter().map(|s| (s.index, s.kind)).collect();
    assert_eq!(
        swings,
        vec![
            (99, SwingKind::Low),
            (149, SwingKind::High),
            (199, SwingKind::Low),
            (249, SwingKind::High),
        ]
    );

    assert_eq!(structure.trend, Trend::Bullish);
    assert_eq!(structure.count(BreakKind::Choch), 0);
    assert_eq!(structure.events.len(), 1);

    let bos = structure.events[0];
    assert_eq!(bos.kind, BreakKind::Bos);
    assert_eq!(bos.direction, Direction::Bullish);
    assert_eq!(bos.index, 240);
    assert_eq!(bos.broken_swing.index, 149);
    assert_close(bos.level, 159.1);
}

#[test]
fn test_swing_lag_and_provisional_tail() {
    let bars = make_rising_zigzag(300, 100.0);
    let analysis = engine(50).analyze("RISE", &bars).unwrap();

    // The last trough has no look-forward yet
    let tail = analysis.structure.provisional.last().unwrap();
    assert_eq!((tail.index, tail.kind, tail.confirmed), (299, SwingKind::Low, false));

    // Confirmed swings are never inside the last swing_length bars
    assert!(analysis.structure.swings.iter().all(|s| s.index + 50 < 300));
}

#[test]
fn test_order_block_from_bos() {
    let bars = make_rising_zigzag(300, 100.0);
    let analysis = engine(50).analyze("RISE", &bars).unwrap();

    assert_eq!(analysis.order_blocks.len(), 1);
    let ob = analysis.order_blocks[0];
    assert_eq!((ob.start_index, ob.end_index), (150, 199));
    assert_close(ob.top, 158.7);
    assert_close(ob.bottom, 118.9);
    assert_eq!(ob.direction, Direction::Bullish);
    assert_eq!(ob.zone, Zone::Equilibrium);
    assert!(!ob.mitigated);
    assert_eq!(ob.overlap_count, 0);
}

// ============================================================
// FAIR VALUE GAPS
// ============================================================

#[test]
fn test_three_bar_bullish_gap() {
    let bars = vec![
        TestBar::new(0, 9.7, 10.0, 9.6, 9.9),
        TestBar::new(1, 9.9, 10.9, 9.9, 10.8),
        TestBar::new(2, 10.8, 11.0, 10.5, 10.9),
    ];
    let gaps = FvgDetector.detect(&bars);

    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].direction, Direction::Bullish);
    assert_eq!(gaps[0].bottom, 10.0);
    assert_eq!(gaps[0].top, 10.5);
    assert!(!gaps[0].filled);
}

#[test]
fn test_overlapping_triplet_has_no_gap() {
    let bars = vec![
        TestBar::new(0, 9.7, 10.6, 9.6, 10.4),
        TestBar::new(1, 10.4, 10.9, 10.2, 10.8),
        TestBar::new(2, 10.8, 11.0, 10.5, 10.9),
    ];
    assert!(FvgDetector.detect(&bars).is_empty());
}

// ============================================================
// INSUFFICIENT DATA
// ============================================================

#[test]
fn test_short_series_is_data_error() {
    let bars = make_rising_zigzag(99, 100.0);
    let engine = engine(50);

    assert_eq!(
        engine.analyze("SHORT", &bars).unwrap_err(),
        DataError::InsufficientData { need: 100, got: 99 }
    );

    let outcome = engine.evaluate("SHORT", "Short Co", &bars);
    let no_signal = outcome.no_signal().unwrap();
    assert_eq!(no_signal.reason, NoSignalReason::InsufficientData);
    assert_eq!(no_signal.to_string(), "SHORT: no signal - reason: insufficient_data");
}

// ============================================================
// TRADE LEVELS
// ============================================================

fn manual_analysis(close: f64, atr: f64) -> Analysis {
    let bars = (0..10)
        .map(|i| Bar::new(i, close, close + 0.1, close - 0.1, close, 1000.0))
        .collect();
    let ob = OrderBlock {
        start_index: 2,
        end_index: 3,
        start_timestamp: 2,
        end_timestamp: 3,
        top: 9.5,
        bottom: 9.0,
        direction: Direction::Bullish,
        zone: Zone::Discount,
        mitigated: false,
        mitigated_index: None,
        overlap_count: 1,
        volume: 2000.0,
        event_index: 5,
    };
    Analysis {
        symbol: "OBX".to_string(),
        bars,
        structure: SwingStructure {
            trend: Trend::Bullish,
            ..Default::default()
        },
        order_blocks: vec![ob],
        fvgs: Vec::new(),
        liquidity: Vec::new(),
        atr,
    }
}

#[test]
fn test_trade_levels_from_block_and_atr() {
    let analysis = manual_analysis(9.6, 0.2);
    let config = SmcConfig {
        atr_multiplier: 1.5,
        ..Default::default()
    };

    let outcome = yasmc::scoring::evaluate(&analysis, "Block Co", &config);
    let signal = outcome.signal().unwrap();
    assert_close(signal.entry_price, 9.0);
    assert_close(signal.stop_loss, 8.7);
    assert_close(signal.target1, 9.6);
    assert_close(signal.target2, 9.9);
    assert_eq!(signal.ob_overlap_count, 1);
}

#[test]
fn test_trade_levels_with_wider_targets() {
    let analysis = manual_analysis(9.6, 0.2);
    let config = SmcConfig {
        atr_multiplier: 1.5,
        target1_r: 3.0,
        target2_r: 4.0,
        ..Default::default()
    };
    assert!(config.validate().is_ok());

    let outcome = yasmc::scoring::evaluate(&analysis, "Block Co", &config);
    let signal = outcome.signal().unwrap();
    assert_close(signal.entry_price, 9.0);
    assert_close(signal.stop_loss, 8.7);
    assert_close(signal.target1, 9.9);
    assert_close(signal.target2, 10.2);
}

// ============================================================
// FULL PIPELINE
// ============================================================

#[test]
fn test_rising_zigzag_signal() {
    let bars = make_rising_zigzag(300, 100.0);
    let outcome = engine(50).evaluate("RISE", "Rising Corp", &bars);
    let signal = outcome.signal().unwrap();

    // zone 25 * 0.4 + trend 20 + distance 20 + fvg 10 + bos 10
    assert_close(signal.composite_score, 70.0);
    assert_close(signal.scores.ob_overlap, 0.0);
    assert_close(signal.entry_price, 118.9);
    assert_close(signal.stop_loss, 118.9 - 0.9 * 1.5);
    assert_eq!(signal.trend, Trend::Bullish);
    assert_eq!(signal.zone, Zone::Equilibrium);
    assert_eq!(signal.estimated_win_rate, WinRateRange { low: 50.0, high: 60.0 });
    assert_eq!(signal.generated_at, 299);
    assert!(signal.warnings.is_empty());
}

#[test]
fn test_pipeline_is_idempotent() {
    let bars = make_rising_zigzag(300, 100.0);
    let engine = engine(50);

    let first = engine.evaluate("RISE", "Rising Corp", &bars);
    let second = engine.evaluate("RISE", "Rising Corp", &bars);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_unsorted_duplicated_input_matches_clean_input() {
    let clean = make_rising_zigzag(300, 100.0);
    let mut messy: Vec<TestBar> = clean.iter().rev().copied().collect();
    let mut stale = clean[42];
    stale.c = stale.o;
    messy.insert(0, stale);

    let engine = engine(50);
    assert_eq!(
        engine.evaluate("RISE", "Rising Corp", &messy),
        engine.evaluate("RISE", "Rising Corp", &clean)
    );
}

#[test]
fn test_universe_ranking() {
    let low = make_rising_zigzag(300, 100.0);
    let high = make_rising_zigzag(300, 200.0);
    let short = make_rising_zigzag(40, 100.0);
    let mut broken = make_rising_zigzag(300, 100.0);
    broken[7].l = broken[7].h + 1.0;

    let instruments = vec![
        Instrument::new("ZZZ", "Zeta", low.as_slice()),
        Instrument::new("AAA", "Alpha", high.as_slice()),
        Instrument::new("SHRT", "Short", short.as_slice()),
        Instrument::new("BRKN", "Broken", broken.as_slice()),
    ];
    let report = analyze_universe(&engine(50), instruments);

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(
        report.outcomes["BRKN"].no_signal().unwrap().reason,
        NoSignalReason::MalformedData
    );
    assert_eq!(
        report.outcomes["SHRT"].no_signal().unwrap().reason,
        NoSignalReason::InsufficientData
    );

    // Equal scores and overlaps: symbol order decides
    let ranked = report.ranked(&Ranker::new());
    let symbols: Vec<&str> = ranked.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAA", "ZZZ"]);

    assert!(report.ranked(&Ranker::new().min_score(80.0)).is_empty());
    assert_eq!(report.ranked(&Ranker::new().top_n(1)).len(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcomes"]["SHRT"]["status"], "no_signal");
    assert_eq!(json["outcomes"]["AAA"]["status"], "signal");
}

#[test]
fn test_invalid_config_is_fatal() {
    let weights = ScoreWeights {
        fvg_alignment: 0.0,
        ..Default::default()
    };
    assert_eq!(
        EngineBuilder::new().weights(weights).build().unwrap_err(),
        ConfigError::WeightSum { sum: 90.0 }
    );
    assert!(matches!(
        SmcEngine::new(SmcConfig {
            zones: ZoneThresholds {
                discount: Ratio::new(0.7).unwrap(),
                premium: Ratio::new(0.3).unwrap(),
            },
            ..Default::default()
        }),
        Err(ConfigError::InvalidThresholds { .. })
    ));
}
