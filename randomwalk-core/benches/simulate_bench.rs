//! Criterion benchmarks for the per-symbol hot path.
//!
//! Benchmarks:
//! 1. Statistics estimation over a two-year history
//! 2. Path generation (1000 paths × 252 days, the default job size)
//! 3. Partitioning a Nasdaq-sized universe

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use randomwalk_core::{
    HistoricalSeries, HistoricalStatsEstimator, PathSimulator, SimulationParams, SymbolPartitioner,
};

fn make_series(n: usize) -> HistoricalSeries {
    let start = NaiveDate::from_ymd_opt(2017, 1, 3).unwrap();
    HistoricalSeries::from_pairs(
        "BENCH",
        (0..n).map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            (start + Duration::days(i as i64), close)
        }),
    )
    .unwrap()
}

fn bench_estimate(c: &mut Criterion) {
    let series = make_series(503);
    let estimator = HistoricalStatsEstimator::default();
    c.bench_function("estimate_503_closes", |b| {
        b.iter(|| estimator.estimate(black_box(&series)))
    });
}

fn bench_simulate(c: &mut Criterion) {
    let params = SimulationParams::new(0.12, 0.28).unwrap();
    let mut group = c.benchmark_group("simulate");
    for iterations in [100usize, 1000] {
        let sim = PathSimulator::new(iterations);
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, _| {
                let mut rng = StdRng::seed_from_u64(42);
                b.iter(|| sim.simulate("BENCH", black_box(&params), 157.0, &mut rng))
            },
        );
    }
    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let symbols: Vec<String> = (0..8856).map(|i| format!("S{i}")).collect();
    let partitioner = SymbolPartitioner::new(128).unwrap();
    c.bench_function("partition_8856_into_128", |b| {
        b.iter(|| partitioner.partition(black_box(&symbols)))
    });
}

criterion_group!(benches, bench_estimate, bench_simulate, bench_partition);
criterion_main!(benches);
