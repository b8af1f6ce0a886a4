use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::*;

use archetype_store::recommended_batch_size;

mod common;
use common::{Position, Velocity, ENTITIES_MED};


fn iterate_benchmark(c: &mut Criterion) {
    let manager = common::setup_store(ENTITIES_MED).expect("store setup failed");
    let batch = recommended_batch_size(ENTITIES_MED, archetype_store::max_parallelism());

    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(ENTITIES_MED as u64));

    group.bench_function("par_process2_100k", |b| {
        b.iter(|| {
            let sum = AtomicU64::new(0);
            manager
                .par_process2::<Position, Velocity, _>(batch, |_, position, velocity| {
                    let dot = position.x * velocity.dx + position.y * velocity.dy;
                    sum.fetch_add(dot as u64, Ordering::Relaxed);
                })
                .expect("parallel pass failed in benchmark");
            black_box(sum.into_inner());
        });
    });

    group.finish();
}

fn transform_benchmark(c: &mut Criterion) {
    let mut manager = common::setup_store(ENTITIES_MED).expect("store setup failed");
    let batch = recommended_batch_size(ENTITIES_MED, archetype_store::max_parallelism());

    let mut group = c.benchmark_group("transform");
    group.throughput(Throughput::Elements(ENTITIES_MED as u64));

    group.bench_function("par_transform1_100k", |b| {
        b.iter(|| {
            manager
                .par_transform1::<Position, _>(batch, |_, position| Position {
                    x: position.x + 0.5,
                    y: position.y + 1.0,
                })
                .expect("transform failed in benchmark");
        });
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark, transform_benchmark);
criterion_main!(benches);
