#![allow(dead_code)]

use archetype_ecs::definition::Definition;
use archetype_ecs::query::Query;
use archetype_ecs::schema::Kind;
use archetype_ecs::World;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, Clone, Copy)]
struct Position(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Velocity(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Health(u32);

fn populated_world(count: usize) -> (World, u8, u8, u8) {
    let mut world = World::new();
    let pos = world.schema_mut().register::<Position>(Kind::Component).unwrap();
    let vel = world.schema_mut().register::<Velocity>(Kind::Component).unwrap();
    let hp = world.schema_mut().register::<Health>(Kind::Component).unwrap();

    for i in 0..count {
        let e = world.create_entity();
        world.add_component(e, Position(1.0, 2.0, 3.0)).unwrap();
        if i % 2 == 0 {
            world.add_component(e, Velocity(0.5, 0.5, 0.5)).unwrap();
        }
        if i % 3 == 0 {
            world.add_component(e, Health(100)).unwrap();
        }
    }

    (world, pos, vel, hp)
}

fn query_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_bench");
    let (world, pos, vel, hp) = populated_world(10_000);

    group.bench_function("single_include_single_column", |b| {
        let include = Definition::EMPTY.with_component(pos, true);
        b.iter(|| {
            let query = Query::new(&world, include, Definition::EMPTY, &[pos]);
            let mut sum = 0usize;
            for row in query.iter() {
                sum += row.columns[0].len();
            }
            black_box(sum);
        });
    });

    group.bench_function("two_component_intersection", |b| {
        let include = Definition::EMPTY.with_component(pos, true).with_component(vel, true);
        b.iter(|| {
            let query = Query::new(&world, include, Definition::EMPTY, &[pos, vel]);
            black_box(query.count());
        });
    });

    group.bench_function("include_with_exclude", |b| {
        let include = Definition::EMPTY.with_component(pos, true);
        let exclude = Definition::EMPTY.with_component(hp, true);
        b.iter(|| {
            let query = Query::new(&world, include, exclude, &[pos]);
            black_box(query.count());
        });
    });

    group.bench_function("iterate_all_three_columns", |b| {
        let include = Definition::EMPTY.with_component(pos, true).with_component(vel, true).with_component(hp, true);
        b.iter(|| {
            let query = Query::new(&world, include, Definition::EMPTY, &[pos, vel, hp]);
            let mut rows = 0usize;
            for row in query.iter() {
                black_box(&row.columns);
                rows += 1;
            }
            black_box(rows);
        });
    });

    group.bench_function("count_only_no_materialization", |b| {
        let include = Definition::EMPTY.with_component(pos, true);
        b.iter(|| {
            let query = Query::new(&world, include, Definition::EMPTY, &[]);
            black_box(query.count());
        });
    });

    group.finish();
}

criterion_group!(benches, query_benchmark);
criterion_main!(benches);
