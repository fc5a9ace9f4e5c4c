//! Concurrent operations benchmarks.
//!
//! Measures concurrent adds on a shared filter, contended and spread out,
//! plus guarded access through a griddle.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use griddle::prelude::*;
use std::sync::Arc;
use std::thread;

const OPS_PER_THREAD: usize = 5_000;

fn run_threads<F>(threads: usize, work: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let work = Arc::clone(&work);
            thread::spawn(move || work(t))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

/// Distinct keys per thread; collisions only through shared words.
fn bench_spread_adds(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_spread_adds");

    for &threads in &[1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements((OPS_PER_THREAD * threads) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_batched(
                || Arc::new(CountingFilter::new(FilterConfig::with_vector_size(1 << 20).unwrap())),
                |filter| {
                    let shared = Arc::clone(&filter);
                    run_threads(threads, move |t| {
                        for i in 0..OPS_PER_THREAD {
                            shared.add(black_box((t * OPS_PER_THREAD + i).to_be_bytes().as_slice())).unwrap();
                        }
                    });
                    black_box(filter)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Every thread hammers one key, maximising CAS retries.
fn bench_hot_key_adds(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_hot_key_adds");

    for &threads in &[2usize, 4, 8] {
        group.throughput(Throughput::Elements((OPS_PER_THREAD * threads) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_batched(
                || Arc::new(CountingFilter::new(FilterConfig::with_vector_size(1 << 10).unwrap())),
                |filter| {
                    let shared = Arc::clone(&filter);
                    run_threads(threads, move |_| {
                        for _ in 0..OPS_PER_THREAD {
                            shared.add(black_box("hot")).unwrap();
                        }
                    });
                    black_box(filter.contention())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_griddle_guarded_adds(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_griddle_adds");
    let dir = tempfile::tempdir().unwrap();

    for &threads in &[1usize, 4] {
        group.throughput(Throughput::Elements((OPS_PER_THREAD * threads) as u64));
        let path = dir.path().join(format!("bench{threads}.15.dat"));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_batched(
                || {
                    Arc::new(
                        Griddle::construct("bench", 15, FilterConfig::with_vector_size(1 << 20).unwrap(), &path)
                            .unwrap(),
                    )
                },
                |griddle| {
                    let shared = Arc::clone(&griddle);
                    run_threads(threads, move |t| {
                        for i in 0..OPS_PER_THREAD {
                            black_box(shared.add(format!("{t}-{i}").as_str()).unwrap());
                        }
                    });
                    black_box(griddle)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spread_adds,
    bench_hot_key_adds,
    bench_griddle_guarded_adds
);
criterion_main!(benches);
