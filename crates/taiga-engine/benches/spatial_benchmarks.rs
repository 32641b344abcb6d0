//! Spatial hot-path benchmarks.
//!
//! Covers the three per-tick costs that scale with the number of players:
//!
//! - **Field of view**: recursive shadowcasting at the default radius on an
//!   open plain and in dense forest.
//! - **Flow fields**: a full `MapView::calc` over a 21x21 view versus a
//!   `recalc` with unchanged targets.
//! - **World tick**: one scheduler step with a crowd of players and NPCs.
//!
//! Run with: `cargo bench --bench spatial_benchmarks`

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_pcg::Pcg64;

use taiga_engine::fov;
use taiga_engine::mapview::MapView;
use taiga_engine::prelude::*;
use taiga_engine::state::WorldState;

const WORLD_SIZE: i32 = 256;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_state() -> WorldState {
    let seed = WorldSeed::uniform(WORLD_SIZE, Biome::Boreal);
    WorldState::from_seed(EngineConfig::default(), &seed).unwrap()
}

/// Boreal forest scattered with the usual pine and spruce density.
fn forest_state() -> WorldState {
    let biomes = vec![Biome::Boreal; (WORLD_SIZE * WORLD_SIZE) as usize];
    let seed = WorldSeed::scatter(WORLD_SIZE, biomes, &mut Pcg64::seed_from_u64(7));
    WorldState::from_seed(EngineConfig::default(), &seed).unwrap()
}

// ---------------------------------------------------------------------------
// Benchmark 1: Field of view
// ---------------------------------------------------------------------------

fn bench_fov(c: &mut Criterion) {
    let open = open_state();
    let forest = forest_state();
    let origin = Coord::new(WORLD_SIZE / 2, WORLD_SIZE / 2);

    let mut group = c.benchmark_group("fov");
    for radius in [5, 10, 20] {
        group.bench_with_input(BenchmarkId::new("open", radius), &radius, |b, &r| {
            b.iter(|| black_box(fov::compute(&open, black_box(origin), r)));
        });
        group.bench_with_input(BenchmarkId::new("forest", radius), &radius, |b, &r| {
            b.iter(|| black_box(fov::compute(&forest, black_box(origin), r)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: Flow fields
// ---------------------------------------------------------------------------

fn bench_mapview(c: &mut Criterion) {
    let forest = forest_state();
    let centre = Coord::new(WORLD_SIZE / 2, WORLD_SIZE / 2);
    let bounds = Rect::around(centre, 10);
    let targets = [centre.offset(-6, -3), centre.offset(4, 7)];

    c.bench_function("mapview_calc_21x21", |b| {
        b.iter(|| {
            let mut view = MapView::new(bounds, |p| forest.walkable(p), Duration::ZERO);
            view.calc(black_box(&targets));
            black_box(view.highest_neighbor(centre))
        });
    });

    let mut view = MapView::new(bounds, |p| forest.walkable(p), Duration::ZERO);
    view.calc(&targets);
    c.bench_function("mapview_recalc_unchanged", |b| {
        b.iter(|| {
            view.recalc(black_box(&targets));
            black_box(view.lowest_neighbor(centre))
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 3: World tick
// ---------------------------------------------------------------------------

fn bench_world_tick(c: &mut Criterion) {
    let mut seed = WorldSeed::uniform(WORLD_SIZE, Biome::Boreal);
    for i in 0..200 {
        let species = if i % 10 == 0 {
            NpcSpecies::BrownBear
        } else {
            NpcSpecies::Rabbit
        };
        seed.npcs.push((Coord::new(8 + (i % 20) * 12, 8 + (i / 20) * 24), species));
    }
    let clock = Arc::new(ManualClock::new());
    let world = Arc::new(World::from_seed(EngineConfig::default(), &seed, clock.clone()).unwrap());
    for i in 0..10 {
        let id = PlayerId::from(format!("bench-{i}"));
        world
            .join_at(&id, &format!("B{i}"), Coord::new(20 + i * 22, 20 + i * 22))
            .unwrap();
    }

    let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
    c.bench_function("world_tick_10_players_200_npcs", |b| {
        b.iter(|| black_box(ticks.advance(&clock)));
    });
}

criterion_group!(benches, bench_fov, bench_mapview, bench_world_tick);
criterion_main!(benches);
