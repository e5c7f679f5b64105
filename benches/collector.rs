//! Recording hot-path benchmarks
//!
//! Measures the warm path (metric already registered), which takes only a
//! read guard on the kind's cache, and the same path under 100-way thread
//! concurrency.
//!
//! Run with: `cargo bench`

use criterion::{Criterion, criterion_group, criterion_main};
use metricache::{MetricCollector, PrometheusCollector, Tags};
use std::thread;
use std::time::{Duration, Instant};

fn bench_increment_counter(c: &mut Criterion) {
    let collector = PrometheusCollector::new();

    c.bench_function("increment_counter_tagged", |b| {
        b.iter(|| {
            collector.increment_counter("bench_counter", Some(Tags::from([("type", "example")])));
        });
    });

    c.bench_function("increment_counter_untagged", |b| {
        b.iter(|| {
            collector.increment_counter("bench_counter_plain", None);
        });
    });
}

fn bench_record_execution_time(c: &mut Criterion) {
    let collector = PrometheusCollector::new();
    let duration = Duration::from_millis(3);

    c.bench_function("record_execution_time", |b| {
        b.iter(|| {
            collector.record_execution_time("bench_latency", duration, None);
        });
    });
}

fn bench_record_value(c: &mut Criterion) {
    let collector = PrometheusCollector::new();

    c.bench_function("record_value", |b| {
        b.iter(|| {
            collector.record_value("bench_gauge", 42.0, None);
        });
    });
}

fn bench_concurrent_increment(c: &mut Criterion) {
    const THREADS: u64 = 100;

    let collector = PrometheusCollector::new();

    c.bench_function("increment_counter_100_threads", |b| {
        b.iter_custom(|iters| {
            let per_thread = (iters / THREADS).max(1);
            let start = Instant::now();
            thread::scope(|scope| {
                for _ in 0..THREADS {
                    scope.spawn(|| {
                        for _ in 0..per_thread {
                            collector.increment_counter(
                                "bench_contended",
                                Some(Tags::from([("type", "example")])),
                            );
                        }
                    });
                }
            });
            start.elapsed()
        });
    });
}

criterion_group!(
    benches,
    bench_increment_counter,
    bench_record_execution_time,
    bench_record_value,
    bench_concurrent_increment
);
criterion_main!(benches);
