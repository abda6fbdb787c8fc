//! Structural mutations racing each other and the tick loop.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use tessera_core::{
    Component, EntityState, FnSystem, QueryDescriptor, Store, StoreConfig, SystemError,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
}

impl Component for Position {
    const ID: u8 = 0;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
}

impl Component for Velocity {
    const ID: u8 = 1;
}

const THREADS: usize = 4;
const PER_THREAD: usize = 250;
const CAPACITY: usize = THREADS * PER_THREAD;

fn shared_store() -> Arc<Store> {
    let moving = FnSystem::new(
        "moving",
        QueryDescriptor::requiring(Position::MASK | Velocity::MASK),
        |store: &Store, _frame, dt, entities| -> Result<(), SystemError> {
            let velocities = store.components::<Velocity>()?;
            let mut positions = store.components_mut::<Position>()?;
            let positions = positions.as_mut_slice();
            for (index, velocity) in velocities.iter_slots(entities) {
                // Velocity may have been detached since the pass started.
                if !store.has_component::<Velocity>(index)? {
                    continue;
                }
                positions[index].x += velocity.x * dt;
            }
            Ok(())
        },
    );
    let resting = FnSystem::new(
        "resting",
        QueryDescriptor::new(Position::MASK, Velocity::MASK),
        |_: &Store, _frame, _dt, _entities| -> Result<(), SystemError> { Ok(()) },
    );

    let store = Store::builder(StoreConfig::with_capacity(CAPACITY))
        .unwrap()
        .with_component::<Position>()
        .unwrap()
        .with_component::<Velocity>()
        .unwrap()
        .with_system(moving)
        .with_system(resting)
        .build()
        .unwrap();
    Arc::new(store)
}

/// Spawns `CAPACITY` entities from `THREADS` threads and promotes them.
fn populate(store: &Arc<Store>) -> Vec<Vec<usize>> {
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(store);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| store.create_entity((Position::default(),)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let owned: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    store.tick(0, 0.0).unwrap();
    owned
}

#[test]
fn test_concurrent_creation_hands_out_distinct_slots() {
    let store = shared_store();
    let owned = populate(&store);

    let all: BTreeSet<usize> = owned.iter().flatten().copied().collect();
    assert_eq!(all.len(), CAPACITY);
    assert_eq!(all, (0..CAPACITY).collect());

    assert!(store.create_entity(()).is_err());
    assert_eq!(store.stats().alive, CAPACITY);
    assert_eq!(store.matching_entities(1).unwrap().len(), CAPACITY);
}

#[test]
fn test_component_toggles_race_the_tick_loop() {
    let store = shared_store();
    let owned = populate(&store);

    let running = Arc::new(AtomicBool::new(true));
    let ticker = {
        let store = Arc::clone(&store);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut frame = 1;
            while running.load(Ordering::Acquire) {
                store.tick(frame, 0.001).unwrap();
                frame += 1;
            }
            frame
        })
    };

    // Every thread leaves its even entities moving and its odd ones resting.
    let workers: Vec<_> = owned
        .into_iter()
        .map(|indices| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..3 {
                    for &index in &indices {
                        store.add_component(index, Velocity { x: 1.0, y: 0.0 }).unwrap();
                    }
                    for &index in indices.iter().filter(|&&index| index % 2 == 1) {
                        assert!(store.remove_component::<Velocity>(index).unwrap());
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    running.store(false, Ordering::Release);
    let frames = ticker.join().unwrap();
    assert!(frames >= 1);

    let moving = store.matching_entities(0).unwrap();
    let resting = store.matching_entities(1).unwrap();
    assert_eq!(moving, (0..CAPACITY).step_by(2).collect::<Vec<_>>());
    assert_eq!(resting, (1..CAPACITY).step_by(2).collect::<Vec<_>>());
    let positions = store.components::<Position>().unwrap();
    let velocities = store.components::<Velocity>().unwrap();
    assert!(positions.as_slice().iter().all(|p| p.x >= 0.0 && p.y.abs() < f32::EPSILON));
    assert!(velocities.get(0).is_some_and(|v| v.y.abs() < f32::EPSILON));
    drop((positions, velocities));

    for index in 0..CAPACITY {
        let slot = store.entity(index).unwrap();
        assert_eq!(slot.state, EntityState::Alive);
        assert_eq!(store.has_component::<Velocity>(index).unwrap(), index % 2 == 0);
    }
}

#[test]
fn test_concurrent_destruction_frees_every_slot() {
    let store = shared_store();
    let owned = populate(&store);

    let handles: Vec<_> = owned
        .into_iter()
        .map(|indices| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for index in indices {
                    store.destroy_entity(index).unwrap();
                    // A second request from another caller is harmless.
                    store.destroy_entity(index).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.stats().destroying, CAPACITY);
    assert_eq!(store.matching_entities(1).unwrap().len(), CAPACITY);

    let stats = store.tick(1, 0.0).unwrap();
    assert_eq!(stats.destroyed, CAPACITY);
    assert_eq!(store.stats().vacant, CAPACITY);
    assert!(store.matching_entities(1).unwrap().is_empty());
    assert_eq!(store.create_entity(()).unwrap(), 0);
}

#[test]
fn test_system_reads_entities_while_holding_storage() {
    let (held_tx, held_rx) = mpsc::channel();
    let reader = FnSystem::new(
        "reader",
        QueryDescriptor::requiring(Position::MASK),
        move |store: &Store, frame, _dt, entities| -> Result<(), SystemError> {
            if frame != 2 {
                return Ok(());
            }
            let positions = store.components::<Position>()?;
            held_tx.send(()).ok();
            // Give the other thread time to queue up behind the guard.
            thread::sleep(Duration::from_millis(100));
            for (index, position) in positions.iter_slots(entities) {
                let slot = store.entity(index)?;
                assert!(slot.has_component(Position::ID));
                assert!(position.x >= 0.0);
            }
            assert_eq!(store.entities().len(), 4);
            Ok(())
        },
    );
    let store = Store::builder(StoreConfig::with_capacity(4))
        .unwrap()
        .with_component::<Position>()
        .unwrap()
        .with_component::<Velocity>()
        .unwrap()
        .with_system(reader)
        .build()
        .unwrap();
    let store = Arc::new(store);

    store.create_entity((Position { x: 1.0, y: 0.0 },)).unwrap();
    let tagged_later = store.create_entity((Velocity::default(),)).unwrap();
    store.tick(1, 0.0).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let ticker = {
        let store = Arc::clone(&store);
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            store.tick(2, 0.0).unwrap();
            done_tx.send("tick").unwrap();
        })
    };
    held_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let mutator = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            assert!(store.add_component(tagged_later, Position { x: 2.0, y: 0.0 }).unwrap());
            store.create_entity((Position { x: 3.0, y: 0.0 },)).unwrap();
            done_tx.send("mutate").unwrap();
        })
    };

    let mut finished = Vec::new();
    for _ in 0..2 {
        finished.push(done_rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }
    ticker.join().unwrap();
    mutator.join().unwrap();
    finished.sort_unstable();
    assert_eq!(finished, vec!["mutate", "tick"]);

    store.tick(3, 0.0).unwrap();
    assert_eq!(store.matching_entities(0).unwrap(), vec![0, 1, 2]);
    let positions = store.components::<Position>().unwrap();
    assert!((positions.get(2).unwrap().x - 3.0).abs() < f32::EPSILON);
}
