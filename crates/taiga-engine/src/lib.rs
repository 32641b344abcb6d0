//! Taiga Engine -- a shared, tile-based world simulation.
//!
//! This crate builds on [`taiga_grid`] to give the packed grid meaning:
//! players, NPCs, item stacks and flora live in arenas, the grid indexes
//! them by cell, and a [`World`](world::World) facade serializes every
//! mutation behind one reader/writer lock so many sessions and a background
//! ticker can share it.
//!
//! The pieces:
//!
//! - [`world`]: the facade. Joins, moves, interactions, rendering.
//! - [`state`]: the locked state and its mutation primitives.
//! - [`fov`]: recursive shadowcasting for per-player sight.
//! - [`mapview`]: local multi-source flow fields for NPC pathing.
//! - [`behavior`]: the defensive and aggressive NPC state machines.
//! - [`tick`]: the fixed-interval scheduler.
//! - [`worldgen`]: seeds handed in by an external terrain generator.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use taiga_engine::prelude::*;
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut seed = WorldSeed::uniform(32, Biome::Boreal);
//! seed.npcs.push((Coord::new(12, 10), NpcSpecies::Rabbit));
//! let world = Arc::new(World::from_seed(EngineConfig::default(), &seed, clock.clone()).unwrap());
//!
//! let ana = PlayerId::from("ana");
//! world.join_at(&ana, "Ana", Coord::new(10, 10)).unwrap();
//! assert_eq!(world.active_npcs().len(), 1);
//!
//! let mut ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
//! ticks.advance(&clock);
//! assert_eq!(ticks.last_diagnostics().npc_turns, 1);
//!
//! let map = world.render_map(&ana, 21, 11).unwrap();
//! assert_eq!(map.rows.len(), 11);
//! ```

#![deny(unsafe_code)]

pub mod behavior;
pub mod clock;
pub mod config;
pub mod events;
pub mod flora;
pub mod fov;
pub mod item;
pub mod mapview;
pub mod npc;
pub mod player;
pub mod recipe;
pub mod render;
pub mod state;
pub mod tick;
pub mod world;
pub mod worldgen;

use taiga_grid::coord::Coord;
use taiga_grid::GridError;

use crate::config::ConfigError;

/// Re-export the storage crate for convenience.
pub use taiga_grid;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world operations.
///
/// Out-of-bounds coordinates and stale handles are not errors; they read as
/// "nothing there". What remains are failures a caller has to degrade on.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An arena is full or a handle does not fit its tile field.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// No free cell was found at or around `origin`.
    #[error("no free cell at or around {origin}")]
    NoPlacement { origin: Coord },

    /// The random spawn search gave up.
    #[error("no spawn cell found after {attempts} attempts")]
    NoSpawn { attempts: u32 },

    #[error("unknown player `{id}`")]
    UnknownPlayer { id: String },

    /// The seed's biome list does not cover its grid.
    #[error("world seed has {actual} biomes, expected {expected}")]
    SeedSizeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use taiga_grid::prelude::*;

    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::events::{Event, EventClass, EventLog};
    pub use crate::flora::{FloraSpecies, HarvestOutcome};
    pub use crate::item::{ItemKind, ItemStack, ItemTraits};
    pub use crate::npc::{Archetype, AttackOutcome, Mood, Npc, NpcSpecies};
    pub use crate::player::{Player, PlayerId};
    pub use crate::recipe::{Recipe, RecipeId};
    pub use crate::render::{RenderedCell, RenderedMap, Rgb, Tier};
    pub use crate::state::TickReport;
    pub use crate::tick::{TickConfig, TickDiagnostics, TickHandle, TickLoop};
    pub use crate::world::{ActivateOutcome, InteractOutcome, MoveOutcome, World};
    pub use crate::worldgen::WorldSeed;
    pub use crate::WorldError;
}
