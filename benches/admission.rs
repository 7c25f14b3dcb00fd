use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gateway_admission::{AdmissionController, EndpointPolicy, TokenBucket};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Benchmark raw bucket arithmetic
fn bench_token_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_bucket");

    group.bench_function("try_consume", |b| {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(1000.0, 1000.0, start);
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            black_box(bucket.try_consume(start + Duration::from_micros(tick)))
        })
    });

    group.finish();
}

/// Benchmark single-threaded admission checks
fn bench_single_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("hot_bucket", |b| {
        let controller = AdmissionController::builder()
            .with_default_policy(EndpointPolicy::per_second(u32::MAX))
            .build()
            .unwrap();
        b.iter(|| {
            for _ in 0..1000 {
                black_box(controller.check(black_box("203.0.113.10"), black_box("/plants")));
            }
        })
    });

    group.bench_function("many_clients", |b| {
        let controller = AdmissionController::default();
        let clients: Vec<String> = (0..1000).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
        b.iter(|| {
            for client in &clients {
                black_box(controller.check(client, "/plants"));
            }
        })
    });

    group.finish();
}

/// Benchmark multi-threaded concurrent checks
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*num_threads as u64) * 1000));

        for (name, shared) in [("shared_bucket", true), ("own_bucket", false)] {
            group.bench_with_input(
                BenchmarkId::new(name, num_threads),
                num_threads,
                |b, &num_threads| {
                    let controller = Arc::new(AdmissionController::default());
                    b.iter(|| {
                        let handles: Vec<_> = (0..num_threads)
                            .map(|i| {
                                let controller = Arc::clone(&controller);
                                std::thread::spawn(move || {
                                    let client = if shared {
                                        "shared".to_string()
                                    } else {
                                        format!("client-{}", i)
                                    };
                                    for _ in 0..1000 {
                                        black_box(controller.check(&client, "/plants"));
                                    }
                                })
                            })
                            .collect();
                        for handle in handles {
                            handle.join().unwrap();
                        }
                    })
                },
            );
        }
    }

    group.finish();
}

/// Benchmark a reaper sweep over a populated registry
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for size in [1_000usize, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("buckets", size), size, |b, &size| {
            let controller = AdmissionController::default();
            for i in 0..size {
                controller.check(&format!("client-{}", i), "/plants");
            }
            let reaper = controller.reaper();
            // Nothing is stale, so every sweep visits all buckets and keeps them
            b.iter(|| black_box(reaper.sweep_now()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_token_bucket,
    bench_single_threaded,
    bench_concurrent,
    bench_sweep
);
criterion_main!(benches);
