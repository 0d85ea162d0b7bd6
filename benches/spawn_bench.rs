#![allow(dead_code)]

use archetype_ecs::schema::Kind;
use archetype_ecs::World;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, Clone, Copy)]
struct Position(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Velocity(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Health(u32);

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_bench");

    group.bench_function("create_entity_only", |b| {
        let mut world = World::new();
        b.iter(|| {
            for _ in 0..1000 {
                black_box(world.create_entity());
            }
        });
    });

    group.bench_function("spawn_2_components", |b| {
        let mut world = World::new();
        b.iter(|| {
            for _ in 0..1000 {
                let e = world.create_entity();
                world.add_component(e, Position(1.0, 2.0, 3.0)).unwrap();
                world.add_component(e, Velocity(1.0, 0.0, 0.0)).unwrap();
                black_box(e);
            }
        });
    });

    group.bench_function("spawn_3_components", |b| {
        let mut world = World::new();
        b.iter(|| {
            for _ in 0..1000 {
                let e = world.create_entity();
                world.add_component(e, Position(1.0, 2.0, 3.0)).unwrap();
                world.add_component(e, Velocity(1.0, 0.0, 0.0)).unwrap();
                world.add_component(e, Health(100)).unwrap();
                black_box(e);
            }
        });
    });

    group.bench_function("spawn_mixed", |b| {
        let mut world = World::new();
        b.iter(|| {
            for i in 0..1000 {
                let e = world.create_entity();
                world.add_component(e, Position(1.0, 2.0, 3.0)).unwrap();
                world.add_component(e, Velocity(1.0, 0.0, 0.0)).unwrap();
                if i % 2 == 0 {
                    world.add_component(e, Health(100)).unwrap();
                }
                black_box(e);
            }
        });
    });

    group.bench_function("destroy_and_recycle", |b| {
        let mut world = World::new();
        world.schema_mut().register::<Position>(Kind::Component).unwrap();
        b.iter(|| {
            let entities: Vec<_> = (0..1000).map(|_| world.create_entity()).collect();
            for e in entities {
                world.destroy_entity(e).unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
