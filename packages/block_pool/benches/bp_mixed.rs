//! Mixed workload on a `Multipool`: objects of several types are constructed and destroyed
//! at random points, compared against the same workload with `Box`.
#![allow(
    missing_docs,
    clippy::indexing_slicing,
    reason = "duty of care is slightly lowered for benchmark code"
)]

use std::hint::black_box;
use std::ptr::NonNull;
use std::time::{Duration, Instant};

use block_pool::Multipool;
use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

/// Number of objects of each type alive before the timed span starts.
const INITIAL_ITEMS: usize = 1_000;

/// Number of construct/destroy pairs performed per iteration.
const OPERATIONS: usize = 10_000;

struct Small(#[expect(dead_code, reason = "only the size matters")] u64);
struct Medium(#[expect(dead_code, reason = "only the size matters")] [u64; 8]);
struct Large(#[expect(dead_code, reason = "only the size matters")] [u64; 32]);

type Pools = Multipool<(Small, Medium, Large)>;

#[derive(Default)]
struct Live {
    small: Vec<NonNull<Small>>,
    medium: Vec<NonNull<Medium>>,
    large: Vec<NonNull<Large>>,
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("bp_mixed");

    group.measurement_time(Duration::from_secs(10));

    group.bench_function("box", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;

            for _ in 0..iters {
                let mut rng = SmallRng::seed_from_u64(42);

                let mut small: Vec<_> = (0..INITIAL_ITEMS).map(|_| Box::new(Small(0))).collect();
                let mut medium: Vec<_> = (0..INITIAL_ITEMS)
                    .map(|_| Box::new(Medium([0; 8])))
                    .collect();
                let mut large: Vec<_> = (0..INITIAL_ITEMS)
                    .map(|_| Box::new(Large([0; 32])))
                    .collect();

                let start = Instant::now();

                for _ in 0..OPERATIONS {
                    match rng.random_range(0..3) {
                        0 => {
                            let index = rng.random_range(0..small.len());
                            small[index] = Box::new(black_box(Small(1)));
                        }
                        1 => {
                            let index = rng.random_range(0..medium.len());
                            medium[index] = Box::new(black_box(Medium([1; 8])));
                        }
                        _ => {
                            let index = rng.random_range(0..large.len());
                            large[index] = Box::new(black_box(Large([1; 32])));
                        }
                    }
                }

                elapsed = elapsed.saturating_add(start.elapsed());
            }

            elapsed
        });
    });

    group.bench_function("multipool", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;

            for _ in 0..iters {
                let mut rng = SmallRng::seed_from_u64(42);
                let mut pools = Pools::new(64);
                let mut live = Live::default();

                for _ in 0..INITIAL_ITEMS {
                    live.small.push(pools.construct(Small(0)));
                    live.medium.push(pools.construct(Medium([0; 8])));
                    live.large.push(pools.construct(Large([0; 32])));
                }

                let start = Instant::now();

                for _ in 0..OPERATIONS {
                    match rng.random_range(0..3) {
                        0 => {
                            let index = rng.random_range(0..live.small.len());

                            // SAFETY: Every pointer in `live` came from `pools` and is alive.
                            unsafe {
                                pools.destroy(live.small[index].as_ptr());
                            }
                            live.small[index] = pools.construct(black_box(Small(1)));
                        }
                        1 => {
                            let index = rng.random_range(0..live.medium.len());

                            // SAFETY: Every pointer in `live` came from `pools` and is alive.
                            unsafe {
                                pools.destroy(live.medium[index].as_ptr());
                            }
                            live.medium[index] = pools.construct(black_box(Medium([1; 8])));
                        }
                        _ => {
                            let index = rng.random_range(0..live.large.len());

                            // SAFETY: Every pointer in `live` came from `pools` and is alive.
                            unsafe {
                                pools.destroy(live.large[index].as_ptr());
                            }
                            live.large[index] = pools.construct(black_box(Large([1; 32])));
                        }
                    }
                }

                elapsed = elapsed.saturating_add(start.elapsed());

                // None of the types has a destructor.
                pools.release_all();
            }

            elapsed
        });
    });

    group.finish();
}
