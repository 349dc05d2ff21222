use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mempool::{Allocation, Policy, Pool};

/// Benchmark an allocate/release churn under both placement policies
fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    for policy in [Policy::FirstFit, Policy::BestFit] {
        group.bench_with_input(
            BenchmarkId::new("mixed_sizes", format!("{policy:?}")),
            &policy,
            |b, &policy| {
                b.iter(|| {
                    let mut pool = Pool::open(1 << 16, policy).unwrap();
                    let mut live: Vec<Allocation> = Vec::new();

                    for step in 0..256usize {
                        let size = 16 + (step * 37) % 240;
                        if let Ok(alloc) = pool.allocate(size) {
                            live.push(alloc);
                        }
                        // Every third step frees the oldest survivor, so
                        // the pool keeps fragmenting and coalescing.
                        if step % 3 == 0 && !live.is_empty() {
                            let victim = live.remove(step % live.len());
                            pool.release(victim).unwrap();
                        }
                    }
                    for alloc in live.drain(..) {
                        pool.release(alloc).unwrap();
                    }

                    black_box(pool.num_gaps())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark placement cost as the number of gaps grows
fn bench_fragmented_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragmented_allocate");

    for gaps in [8usize, 64, 256] {
        for policy in [Policy::FirstFit, Policy::BestFit] {
            group.bench_with_input(
                BenchmarkId::new(format!("{policy:?}"), gaps),
                &gaps,
                |b, &gaps| {
                    // Checkerboard of allocations: release every other
                    // one to leave `gaps` separated gaps behind.
                    let mut pool = Pool::open(gaps * 64, policy).unwrap();
                    let allocs: Vec<Allocation> =
                        (0..gaps * 2).map(|_| pool.allocate(32).unwrap()).collect();
                    for alloc in allocs.iter().step_by(2) {
                        pool.release(*alloc).unwrap();
                    }

                    b.iter(|| {
                        let alloc = pool.allocate(32).unwrap();
                        pool.release(black_box(alloc)).unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_churn, bench_fragmented_allocate);
criterion_main!(benches);
