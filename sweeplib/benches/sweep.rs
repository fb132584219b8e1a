use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sweeplib::config::{Implementation, SweepConfig, SweepPoint, IMPLEMENTATIONS};
use sweeplib::parser::parse_hit_rate;
use sweeplib::protocol::encode;
use sweeplib::run_sweep;
use sweeplib::util::synthetic_simulator;

/// Encoding and parsing on their own, for every implementation
pub fn protocol_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Protocol");
    let config = SweepConfig::default();
    for implementation in IMPLEMENTATIONS.iter() {
        let point = SweepPoint::new(&config, implementation, 12);
        group.bench_with_input(BenchmarkId::new("encode", implementation.label), &point, |bench, point| {
            bench.iter(|| encode(black_box(point)));
        });
    }
    let output = format!("{}hit rate 0.9873046875\n", "Reading trace file...\n".repeat(64));
    group.bench_function("parse_hit_rate", |bench| {
        bench.iter(|| parse_hit_rate(black_box(&output)).unwrap());
    });
    group.finish();
}

/// Whole sweeps against the in-process simulator, to keep process start up out of the numbers
pub fn sweep_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sweep");
    for jobs in [1, 4] {
        let config = SweepConfig {
            min_exponent: 8,
            max_exponent: 24,
            implementations: Implementation::defaults().iter().map(|imp| imp.label.to_string()).collect(),
            jobs,
            ..SweepConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("jobs", jobs), &config, |bench, config| {
            bench.iter(|| run_sweep(config, &synthetic_simulator).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = protocol_benchmark, sweep_benchmark
);
criterion_main!(benches);
