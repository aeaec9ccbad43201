//! Basic benchmarks for the `block_pool` crate, comparing pooled objects against `Box`
//! for a range of object sizes.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use block_pool::Pool;
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

/// How many objects are alive at the same time in the churn benchmarks.
const LIVE_OBJECTS: usize = 1_000;

fn entrypoint(c: &mut Criterion) {
    bench_size::<8>(c);
    bench_size::<32>(c);
    bench_size::<64>(c);
    bench_size::<128>(c);
}

fn bench_size<const SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("bp_basic_{SIZE}"));

    group.bench_function("build_empty", |b| {
        b.iter(|| {
            drop(black_box(Pool::<[u8; SIZE]>::new(LIVE_OBJECTS)));
        });
    });

    group.bench_function("box_new_drop", |b| {
        b.iter(|| {
            drop(black_box(Box::new(black_box([0_u8; SIZE]))));
        });
    });

    group.bench_function("pool_construct_destroy", |b| {
        let mut pool = Pool::<[u8; SIZE]>::new(1);

        b.iter(|| {
            let item = pool.construct(black_box([0_u8; SIZE]));

            // SAFETY: The pointer came from this pool and has not been destroyed yet.
            unsafe {
                pool.destroy(black_box(item.as_ptr()));
            }
        });
    });

    group.bench_function("box_churn", |b| {
        b.iter_custom(|iters| {
            let mut boxes = Vec::with_capacity(LIVE_OBJECTS);

            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..LIVE_OBJECTS {
                    boxes.push(Box::new(black_box([0_u8; SIZE])));
                }

                boxes.clear();
            }

            start.elapsed()
        });
    });

    group.bench_function("pool_churn", |b| {
        b.iter_custom(|iters| {
            let mut pool = Pool::<[u8; SIZE]>::new(1);
            let mut items = Vec::with_capacity(LIVE_OBJECTS);

            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..LIVE_OBJECTS {
                    items.push(pool.construct(black_box([0_u8; SIZE])));
                }

                for item in items.drain(..) {
                    // SAFETY: The pointer came from this pool and has not been destroyed yet.
                    unsafe {
                        pool.destroy(item.as_ptr());
                    }
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("pool_churn_release", |b| {
        b.iter_custom(|iters| {
            let mut pool = Pool::<[u8; SIZE]>::new(1);

            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..LIVE_OBJECTS {
                    _ = black_box(pool.construct(black_box([0_u8; SIZE])));
                }

                // The objects have no destructor, so we can skip destroying them one by one.
                pool.release();
            }

            start.elapsed()
        });
    });

    group.finish();
}
