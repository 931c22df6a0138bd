//! # ECS Performance Benchmark
//!
//! Measures the hot paths every frame leans on:
//! - sparse-set insert/remove churn
//! - two-term view iteration with a mutable term
//! - pool acquire/release cycles
//!
//! Run with: `cargo bench --package kestrel_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel_core::{
    EntityRegistry, GameObjectPoolId, GameObjectPoolManager, SparseSet, Transform, Vec3, Velocity,
    ViewFilter,
};

const ENTITY_COUNTS: [usize; 3] = [1_000, 10_000, 100_000];

fn populated_registry(count: usize) -> EntityRegistry {
    let mut registry = EntityRegistry::with_capacity(count, 1);
    registry.register_component::<Transform>().unwrap();
    registry.register_component::<Velocity>().unwrap();

    for i in 0..count {
        let entity = registry.create();
        registry.insert(entity, Transform::IDENTITY).unwrap();
        // Half the entities move, so the view has to probe
        if i % 2 == 0 {
            registry.insert(entity, Velocity(Vec3::new(0.1, 0.2, 0.3))).unwrap();
        }
    }
    registry
}

/// Insert then remove every id, in a fresh set each iteration.
fn bench_sparse_set_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_set_churn");

    for count in ENTITY_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut set = SparseSet::with_capacity(count);
                for id in 0..count as u32 {
                    set.insert(id, id);
                }
                for id in (0..count as u32).step_by(2) {
                    set.remove(id);
                }
                black_box(set.len())
            });
        });
    }

    group.finish();
}

/// The movement pass: `(&mut Transform, &Velocity)`.
fn bench_view_movement(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_movement");

    for count in ENTITY_COUNTS {
        let registry = populated_registry(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                registry
                    .find::<(&mut Transform, &Velocity)>()
                    .unwrap()
                    .with_filter(ViewFilter::ACTIVE)
                    .each(|_, (transform, velocity)| {
                        transform.position += velocity.0 * 0.016;
                    });
            });
        });
    }

    group.finish();
}

/// Raw dense-slice pass for comparison with the view.
fn bench_dense_slice(c: &mut Criterion) {
    let registry = populated_registry(100_000);

    c.bench_function("dense_slice_100k", |b| {
        b.iter(|| {
            let mut transforms = registry.write_column::<Transform>().unwrap();
            for transform in transforms.as_mut_slice() {
                transform.position += Vec3::splat(0.001);
            }
            black_box(transforms.len())
        });
    });
}

/// Acquire the whole pool, then release it.
fn bench_pool_cycle(c: &mut Criterion) {
    let mut registry = EntityRegistry::with_capacity(10_000, 1);
    registry.register_component::<Transform>().unwrap();
    let mut pools = GameObjectPoolManager::new();
    let id = GameObjectPoolId(0);
    pools
        .create_pool(&mut registry, id, 10_000, |object| {
            object.add(Transform::IDENTITY).map(|_| ())
        })
        .unwrap();

    let mut acquired = Vec::with_capacity(10_000);
    c.bench_function("pool_cycle_10k", |b| {
        b.iter(|| {
            while let Some(slot) = pools.acquire(&registry, id).unwrap() {
                acquired.push(slot.guid);
            }
            for guid in acquired.drain(..) {
                pools.release(&mut registry, guid);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_sparse_set_churn,
    bench_view_movement,
    bench_dense_slice,
    bench_pool_cycle,
);
criterion_main!(benches);
