//! Throughput benchmarks for multi-instrument evaluation.
//!
//! Run with: `cargo bench --bench throughput`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

use risk_manager::{ManualClock, RiskEvent, RiskManager, RiskObserver};
use scalp_core::{Candle, RiskConfig, SignalConfig};
use signal_engine::SignalEngine;

struct NullObserver;

impl RiskObserver for NullObserver {
    fn on_event(&self, _event: &RiskEvent) {}
}

/// Generate a random-walk candle window.
fn generate_random_candles(rng: &mut impl Rng, len: usize) -> Vec<Candle> {
    let mut close: f64 = rng.gen_range(10.0..70_000.0);
    (0..len)
        .map(|i| {
            let open = close;
            close *= 1.0 + rng.gen_range(-0.004..0.004);
            let high = open.max(close) * 1.001;
            let low = open.min(close) * 0.999;
            let volume = rng.gen_range(50.0..500.0);
            Candle::new(i as i64 * 300_000, open, high, low, close, volume)
        })
        .collect()
}

fn generate_universe(count: usize, len: usize) -> Vec<(String, Vec<Candle>)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| (format!("SYM{}/USDC:USDC", i), generate_random_candles(&mut rng, len)))
        .collect()
}

/// Benchmark sequential vs parallel analysis of many instruments.
fn bench_universe(c: &mut Criterion) {
    let mut group = c.benchmark_group("universe");
    let engine = SignalEngine::new(SignalConfig::default());

    for count in [10, 100, 1000].iter() {
        let universe = generate_universe(*count, 100);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("sequential", count), &universe, |b, universe| {
            b.iter(|| {
                let results: Vec<_> = universe
                    .iter()
                    .map(|(_, candles)| engine.analyze(black_box(candles)))
                    .collect();
                black_box(results)
            })
        });

        group.bench_with_input(BenchmarkId::new("parallel", count), &universe, |b, universe| {
            b.iter(|| {
                let results: Vec<_> = universe
                    .par_iter()
                    .map(|(_, candles)| engine.analyze(black_box(candles)))
                    .collect();
                black_box(results)
            })
        });

        group.bench_with_input(BenchmarkId::new("analyze_many", count), &universe, |b, universe| {
            b.iter(|| black_box(engine.analyze_many(black_box(universe))))
        });
    }

    group.finish();
}

/// Benchmark recording a burst of trade results against one account.
fn bench_record_pnl(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_pnl");
    let mut rng = rand::thread_rng();

    for trades in [100, 1000].iter() {
        let pnls: Vec<Decimal> = (0..*trades)
            .map(|_| Decimal::new(rng.gen_range(-500..500), 2))
            .collect();

        group.throughput(Throughput::Elements(*trades as u64));
        group.bench_with_input(BenchmarkId::new("trades", trades), &pnls, |b, pnls| {
            b.iter(|| {
                let clock = ManualClock::new(chrono::Utc::now());
                let mut manager = RiskManager::with_clock(RiskConfig::default(), Arc::new(clock))
                    .with_observer(Arc::new(NullObserver));
                manager.check_new_day(Decimal::new(10_000, 0));
                for pnl in pnls {
                    black_box(manager.record_pnl(*pnl, Decimal::new(10_000, 0)));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_universe, bench_record_pnl);
criterion_main!(benches);
