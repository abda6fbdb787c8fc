//! # Store Benchmark
//!
//! Measures the hot paths of a fixed-capacity store:
//! - component toggles with query re-evaluation
//! - the create/destroy cycle through tick flushes
//! - a system pass over a populated query
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{
    Component, FnSystem, QueryDescriptor, Store, StoreConfig, System, SystemError,
};

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Position {
    const ID: u8 = 0;
}

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Velocity {
    const ID: u8 = 1;
}

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Stunned(u32);

impl Component for Stunned {
    const ID: u8 = 2;
}

fn movement() -> impl System {
    FnSystem::new(
        "movement",
        QueryDescriptor::new(Position::MASK | Velocity::MASK, Stunned::MASK),
        |store: &Store, _frame, dt, entities| -> Result<(), SystemError> {
            let velocities = store.components::<Velocity>()?;
            let mut positions = store.components_mut::<Position>()?;
            let positions = positions.as_mut_slice();
            for (index, v) in velocities.iter_slots(entities) {
                let p = &mut positions[index];
                p.x += v.x * dt;
                p.y += v.y * dt;
                p.z += v.z * dt;
            }
            Ok(())
        },
    )
}

fn populated_store(count: usize) -> Store {
    let store = Store::builder(StoreConfig::with_capacity(count))
        .and_then(|b| b.with_component::<Position>())
        .and_then(|b| b.with_component::<Velocity>())
        .and_then(|b| b.with_component::<Stunned>())
        .and_then(|b| b.with_system(movement()).build())
        .expect("store config is valid");

    for i in 0..count {
        let f = i as f32;
        store
            .create_entity((Position::default(), Velocity { x: f, y: 1.0, z: 0.5 }))
            .expect("capacity sized for the population");
    }
    store.tick(0, 0.0).expect("first tick");
    store
}

/// Benchmark: Tick with one system over every entity.
fn bench_system_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("system_pass");

    for count in [10_000, ENTITY_COUNT] {
        let store = populated_store(count);
        let mut frame = 1;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                frame += 1;
                black_box(store.tick(frame, 0.016).expect("tick"))
            });
        });
    }

    group.finish();
}

/// Benchmark: Attach and detach a component, re-evaluating the query each time.
fn bench_component_toggle(c: &mut Criterion) {
    let store = populated_store(ENTITY_COUNT);

    c.bench_function("toggle_stunned_10K", |b| {
        b.iter(|| {
            for index in 0..10_000 {
                store.add_component(index, Stunned(1)).expect("alive");
            }
            for index in 0..10_000 {
                store.remove_component::<Stunned>(index).expect("alive");
            }
            black_box(store.matching_entities(0).map(|m| m.len()))
        });
    });
}

/// Benchmark: Destroy and re-create 10K entities through two flushes.
fn bench_create_destroy_cycle(c: &mut Criterion) {
    let store = populated_store(ENTITY_COUNT);
    let mut frame = 1;

    c.bench_function("create_destroy_cycle_10K", |b| {
        b.iter(|| {
            for index in 0..10_000 {
                store.destroy_entity(index).expect("alive");
            }
            frame += 1;
            store.tick(frame, 0.0).expect("tick");
            for _ in 0..10_000 {
                store
                    .create_entity((Position::default(), Velocity::default()))
                    .expect("slots were just freed");
            }
            frame += 1;
            black_box(store.tick(frame, 0.0).expect("tick"))
        });
    });
}

criterion_group!(
    benches,
    bench_system_pass,
    bench_component_toggle,
    bench_create_destroy_cycle,
);

criterion_main!(benches);
