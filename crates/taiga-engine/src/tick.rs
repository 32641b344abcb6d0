//! Fixed-interval tick scheduler.
//!
//! The [`TickLoop`] drives a shared [`World`] forward. Each tick, under one
//! write lock:
//!
//! 1. World age advances by the time since the previous tick.
//! 2. Every active NPC whose speed gate is open takes a turn, in handle order.
//! 3. Every player on the grid accrues hunger.
//!
//! NPCs outside every player's activation box are never visited, so the cost
//! of a tick follows the number of players, not the size of the world.
//!
//! The loop can be stepped by hand (tests, deterministic drivers) or moved
//! onto a background thread with [`TickLoop::spawn`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taiga_engine::prelude::*;
//!
//! let clock = Arc::new(ManualClock::new());
//! let seed = WorldSeed::uniform(16, Biome::Boreal);
//! let world = Arc::new(World::from_seed(EngineConfig::default(), &seed, clock.clone()).unwrap());
//!
//! let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
//! for _ in 0..10 {
//!     ticks.advance(&clock);
//! }
//! assert_eq!(ticks.tick_count(), 10);
//! assert_eq!(world.now(), std::time::Duration::from_secs(1));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::clock::ManualClock;
use crate::state::TickReport;
use crate::world::World;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickConfig {
    /// Time between ticks. Must be non-zero.
    pub interval: Duration,
}

impl Default for TickConfig {
    /// 100 ms, ten ticks per second.
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// What the last tick did and how long it took.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickDiagnostics {
    pub npc_turns: usize,
    pub players_ticked: usize,
    /// Wall-clock time spent inside the tick, lock wait included.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

pub struct TickLoop {
    world: Arc<World>,
    config: TickConfig,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    pub fn new(world: Arc<World>, config: TickConfig) -> Self {
        Self {
            world,
            config,
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Run one tick at the world clock's current reading.
    pub fn tick(&mut self) -> TickReport {
        let start = Instant::now();
        let report = self.world.tick();
        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            npc_turns: report.npc_turns,
            players_ticked: report.players_ticked,
            total_time: start.elapsed(),
        };
        trace!(
            tick = self.tick_counter,
            npc_turns = report.npc_turns,
            players = report.players_ticked,
            elapsed_us = self.last_diagnostics.total_time.as_micros() as u64,
            "tick"
        );
        report
    }

    /// Run `count` ticks without advancing any clock. Returns the total
    /// number of NPC turns taken.
    pub fn run_ticks(&mut self, count: u64) -> usize {
        (0..count).map(|_| self.tick().npc_turns).sum()
    }

    /// Advance `clock` by one interval, then tick.
    pub fn advance(&mut self, clock: &ManualClock) -> TickReport {
        clock.advance(self.config.interval);
        self.tick()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Move the loop onto a background thread that ticks every interval
    /// until stopped.
    pub fn spawn(mut self) -> std::io::Result<TickHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("taiga-tick".to_owned())
            .spawn(move || {
                debug!(interval_ms = self.config.interval.as_millis() as u64, "tick loop started");
                while !flag.load(Ordering::Acquire) {
                    let start = Instant::now();
                    self.tick();
                    thread::sleep(self.config.interval.saturating_sub(start.elapsed()));
                }
                debug!(ticks = self.tick_counter, "tick loop stopped");
                self
            })?;
        Ok(TickHandle { stop, thread })
    }
}

/// A running background tick loop.
pub struct TickHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<TickLoop>,
}

impl TickHandle {
    /// Stop after the current tick and hand the loop back.
    pub fn stop(self) -> thread::Result<TickLoop> {
        self.stop.store(true, Ordering::Release);
        self.thread.join()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::EngineConfig;
    use crate::npc::NpcSpecies;
    use crate::player::PlayerId;
    use crate::worldgen::WorldSeed;
    use taiga_grid::coord::Coord;
    use taiga_grid::tile::Biome;

    fn manual_world(size: i32) -> (Arc<World>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let seed = WorldSeed::uniform(size, Biome::Boreal);
        let world = World::from_seed(EngineConfig::default(), &seed, clock.clone()).unwrap();
        (Arc::new(world), clock)
    }

    #[test]
    fn ticks_without_players_touch_no_npcs() {
        let (world, clock) = manual_world(20);
        world.spawn_npc(NpcSpecies::Rabbit, Coord::new(5, 5)).unwrap();
        let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
        for _ in 0..5 {
            assert_eq!(ticks.advance(&clock).npc_turns, 0);
        }
        assert!(world.active_npcs().is_empty());
        assert_eq!(ticks.tick_count(), 5);
    }

    #[test]
    fn nearby_npcs_are_throttled_by_speed() {
        let (world, clock) = manual_world(30);
        world.join_at(&PlayerId::from("a"), "a", Coord::new(10, 10)).unwrap();
        world.spawn_npc(NpcSpecies::Rabbit, Coord::new(14, 14)).unwrap();
        let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
        // A calm rabbit needs more than 0.8 s between turns: 0.1 s, 1.0 s, 1.9 s.
        let turns: usize = (0..20).map(|_| ticks.advance(&clock).npc_turns).sum();
        assert_eq!(turns, 3);
        assert_eq!(ticks.last_diagnostics().players_ticked, 1);
    }

    #[test]
    fn world_age_follows_the_clock() {
        let (world, clock) = manual_world(8);
        let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
        ticks.tick();
        clock.advance(Duration::from_secs_f64(6.66 * 100.5));
        let report = ticks.tick();
        assert!((report.days - 100.5).abs() < 1e-6);
        assert_eq!(world.render_world_status(), "summer : Year 0, Day 100");
    }

    #[test]
    fn hunger_accrues_only_while_online() {
        let (world, clock) = manual_world(8);
        let id = PlayerId::from("a");
        world.join_at(&id, "a", Coord::new(2, 2)).unwrap();
        let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
        ticks.tick();
        clock.advance(Duration::from_secs(1800));
        ticks.tick();
        let hunger = world.player(&id).unwrap().hunger;
        assert!((hunger - 0.5).abs() < 1e-9);

        world.disconnect(&id).unwrap();
        clock.advance(Duration::from_secs(3600));
        ticks.tick();
        world.join(&id, "a").unwrap();
        ticks.tick();
        assert!((world.player(&id).unwrap().hunger - 0.5).abs() < 1e-9);
    }

    #[test]
    fn background_loop_ticks_until_stopped() {
        let seed = WorldSeed::uniform(8, Biome::Boreal);
        let world = World::from_seed(EngineConfig::default(), &seed, Arc::new(SystemClock::new())).unwrap();
        let config = TickConfig {
            interval: Duration::from_millis(5),
        };
        let handle = TickLoop::new(Arc::new(world), config).spawn().unwrap();
        thread::sleep(Duration::from_millis(60));
        let ticks = handle.stop().unwrap();
        assert!(ticks.tick_count() >= 1);
    }
}
