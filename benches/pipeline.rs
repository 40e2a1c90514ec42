//! Benchmarks for the per-instrument pipeline and universe analysis.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
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

/// Generate trending bars with pullbacks
fn generate_bars(n: usize) -> Vec<TestBar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 0.9; // Deterministic "random", slight upward drift
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = (price + change).max(1.0);
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;

    bars.push(TestBar { t: i as i64, o, h, l, c });
    price = c;
  }

  bars
}

fn engine() -> SmcEngine {
  EngineBuilder::new().swing_length(10).build().unwrap()
}

fn bench_analyze(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let engine = engine();

  c.bench_function("analyze_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.analyze("BENCH", black_box(&bars)));
    })
  });
}

fn bench_evaluate(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let engine = engine();

  c.bench_function("evaluate_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.evaluate("BENCH", "Bench", black_box(&bars)));
    })
  });
}

fn bench_swings(c: &mut Criterion) {
  let bars = generate_bars(1000);

  let mut group = c.benchmark_group("swing_length");

  for len in [5, 20, 50].iter() {
    let detector = SwingDetector::new(Period::new(*len).unwrap());
    group.bench_with_input(BenchmarkId::new("detect", len), len, |b, _| {
      b.iter(|| {
        let _ = black_box(detector.detect(black_box(&bars)));
      })
    });
  }

  group.finish();
}

fn bench_scaling(c: &mut Criterion) {
  let engine = engine();

  let mut group = c.benchmark_group("scaling");

  for size in [100, 500, 1000, 5000, 10000].iter() {
    let bars = generate_bars(*size);

    group.bench_with_input(BenchmarkId::new("evaluate", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(engine.evaluate("BENCH", "Bench", black_box(&bars)));
      })
    });
  }

  group.finish();
}

fn bench_universe(c: &mut Criterion) {
  let series: Vec<(String, Vec<TestBar>)> =
    (0..16).map(|i| (format!("SYM{i:02}"), generate_bars(1000 + i * 10))).collect();

  let engine = engine();

  c.bench_function("analyze_universe_16_instruments", |b| {
    b.iter(|| {
      let instruments: Vec<Instrument<'_, TestBar>> =
        series.iter().map(|(sym, bars)| Instrument::new(sym, sym, bars)).collect();
      let _ = black_box(analyze_universe(black_box(&engine), instruments));
    })
  });
}

criterion_group!(benches, bench_analyze, bench_evaluate, bench_swings, bench_scaling, bench_universe);
criterion_main!(benches);
