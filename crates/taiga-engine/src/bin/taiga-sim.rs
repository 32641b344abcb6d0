//! Headless Taiga simulation.
//!
//! Generates an island world, drops two wandering players onto it, runs the
//! tick loop on a manual clock and prints what the first player sees.
//!
//! ```text
//! taiga-sim [config.json] [ticks]
//! ```
//!
//! Set `RUST_LOG=debug` to watch moves, attacks and harvests.

use std::sync::Arc;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use taiga_engine::prelude::*;
use tracing::info;

const DEFAULT_TICKS: u64 = 600;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            EngineConfig::from_json_str(&json).with_context(|| format!("loading {path}"))?
        }
        None => EngineConfig {
            world_size: 96,
            ..Default::default()
        },
    };
    let ticks: u64 = match args.next() {
        Some(n) => n.parse().with_context(|| format!("tick count `{n}`"))?,
        None => DEFAULT_TICKS,
    };

    let clock = Arc::new(ManualClock::new());
    let world = Arc::new(World::new(config.clone(), clock.clone())?);
    let players = [PlayerId::from("p1"), PlayerId::from("p2")];
    for (id, name) in players.iter().zip(["Aino", "Veli"]) {
        let at = world.join(id, name)?;
        info!(player = %id, %at, "spawned");
    }
    world.on_death(&players[0], |msg| println!("!! {msg}"));

    let mut rng = Pcg64::seed_from_u64(config.seed ^ 0x51A);
    let mut ticker = TickLoop::new(Arc::clone(&world), config.tick_config());
    for _ in 0..ticks {
        ticker.advance(&clock);
        for id in &players {
            let (dx, dy) = (rng.gen_range(-1..=1), rng.gen_range(-1..=1));
            world.move_player(id, dx, dy)?;
            if rng.gen_bool(0.1) {
                world.interact(id)?;
            }
        }
    }

    let diagnostics = ticker.last_diagnostics();
    info!(
        ticks = ticker.tick_count(),
        active_npcs = world.active_npcs().len(),
        last_tick_us = diagnostics.total_time.as_micros() as u64,
        "simulation finished"
    );

    let viewer = &players[0];
    print!("{}", world.render_map(viewer, 40, 20)?.to_text());
    println!();
    print!("{}", world.render_player_sidebar(viewer)?);
    println!();
    print!("{}", world.render_player_events(viewer)?);
    println!("{}", world.render_world_status());
    print!("{}", world.world_events());
    Ok(())
}
