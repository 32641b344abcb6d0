//! The world facade.
//!
//! [`World`] owns the single reader/writer lock around [`WorldState`] and the
//! [`Clock`] every time-gated rule reads. All mutation enters through `&self`
//! methods here, so a `World` is shared between session threads and the tick
//! scheduler as an `Arc<World>`.
//!
//! # Locking
//!
//! Every mutating call takes the write lock for its whole duration and stamps
//! the state with the current clock reading first. Listener callbacks queued
//! during the call are invoked only after the lock has been released, so a
//! listener may call back into the world. Render queries take the read lock.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taiga_engine::prelude::*;
//!
//! let clock = Arc::new(ManualClock::new());
//! let seed = WorldSeed::uniform(16, Biome::Boreal);
//! let world = World::from_seed(EngineConfig::default(), &seed, clock.clone()).unwrap();
//!
//! let ana = PlayerId::from("ana");
//! world.join_at(&ana, "Ana", Coord::new(4, 4)).unwrap();
//! clock.advance(std::time::Duration::from_millis(100));
//! let moved = world.move_player(&ana, 1, 0).unwrap();
//! assert_eq!(moved, MoveOutcome::Moved(Coord::new(5, 4)));
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use taiga_grid::arena::Handle;
use taiga_grid::coord::Coord;
use taiga_grid::tile::Tile;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::events::EventClass;
use crate::flora::{FloraSpecies, HarvestOutcome};
use crate::item::{ItemKind, ItemStack, ItemTraits};
use crate::npc::{AttackOutcome, Npc, NpcSpecies};
use crate::player::{Player, PlayerId, PlayerRecord, PlayerView, SharedView};
use crate::recipe::{self, Recipe, RecipeId};
use crate::render::{
    background, biome_appearance, compass_indicator, foreground, progress_bar, world_status, RenderedCell,
    RenderedMap, Tier,
};
use crate::state::{Listener, TickReport, WorldState};
use crate::worldgen::{self, WorldSeed};
use crate::WorldError;

/// Width of the activity bar in the sidebar.
const ACTIVITY_BAR_WIDTH: usize = 20;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a directional move turned into.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveOutcome {
    /// The player stepped onto this cell.
    Moved(Coord),
    /// An NPC stood there and was attacked.
    Attacked(AttackOutcome),
    /// The cell held unwalkable flora, which was worked instead.
    Harvested(HarvestOutcome),
    /// Water, the map edge, or another agent.
    Blocked,
    /// The move cooldown has not elapsed.
    Cooldown,
    /// The player is not on the grid.
    Inactive,
}

/// What interacting with the player's own cell did.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractOutcome {
    /// Units picked up; zero when the pack was full.
    PickedUp(u32),
    Harvested(HarvestOutcome),
    Nothing,
    Cooldown,
    Inactive,
}

/// What activating an inventory entry did.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActivateOutcome {
    /// One unit was eaten, removing this much hunger.
    Ate { kind: ItemKind, relief: f64 },
    Wielded(ItemKind),
    /// The item has no use on its own.
    Unusable(ItemKind),
}

enum Readiness {
    Ready(Coord),
    Cooldown,
    Inactive,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct World {
    state: RwLock<WorldState>,
    clock: Arc<dyn Clock>,
}

impl World {
    /// Generate an island world from `config.seed` and `config.world_size`.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, WorldError> {
        config.validate()?;
        let mut rng = Pcg64::seed_from_u64(config.seed);
        let heights = worldgen::island_heights(config.world_size, &mut rng);
        let biomes = worldgen::biomes_from_heights(&heights);
        let seed = WorldSeed::scatter(config.world_size, biomes, &mut rng);
        Self::from_seed(config, &seed, clock)
    }

    /// Build a world from an externally generated seed.
    pub fn from_seed(config: EngineConfig, seed: &WorldSeed, clock: Arc<dyn Clock>) -> Result<Self, WorldError> {
        let state = WorldState::from_seed(config, seed)?;
        Ok(Self {
            state: RwLock::new(state),
            clock,
        })
    }

    /// Elapsed world time.
    pub fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Run `op` under the write lock, then deliver whatever it queued.
    fn write<R>(&self, op: impl FnOnce(&mut WorldState) -> R) -> R {
        let (out, deliveries) = {
            let mut state = self.state.write();
            state.now = self.clock.elapsed();
            let out = op(&mut state);
            (out, state.take_outbox())
        };
        for delivery in deliveries {
            (delivery.listener)(&delivery.message);
        }
        out
    }

    fn read<R>(&self, op: impl FnOnce(&WorldState) -> R) -> R {
        op(&self.state.read())
    }

    /// Read access for inspection and tests.
    pub fn state(&self) -> RwLockReadGuard<'_, WorldState> {
        self.state.read()
    }

    // -- Sessions ------------------------------------------------------------

    /// Put a player on the grid and return where they landed.
    ///
    /// A new id gets a random spawn. A known, disconnected id resumes at its
    /// stored location (or the nearest free cell if that one is taken). A
    /// dead player is revived at a fresh spawn. Joining while already on the
    /// grid only updates the display name.
    pub fn join(&self, id: &PlayerId, name: &str) -> Result<Coord, WorldError> {
        self.write(|s| s.join(id, name, None))
    }

    /// Like [`join`](Self::join), but a first join (or a revival) spawns at
    /// `at` instead of a random cell.
    pub fn join_at(&self, id: &PlayerId, name: &str, at: Coord) -> Result<Coord, WorldError> {
        self.write(|s| s.join(id, name, Some(at)))
    }

    /// Take a player off the grid. Their record stays for a later reconnect;
    /// their listeners are dropped.
    pub fn disconnect(&self, id: &PlayerId) -> Result<(), WorldError> {
        self.write(|s| s.disconnect(id))
    }

    // -- Player actions ------------------------------------------------------

    /// Move one cell. Deltas are clamped to `-1..=1`.
    ///
    /// An NPC in the destination is attacked; a free walkable cell is entered;
    /// unwalkable flora is harvested. Every attempt, successful or not,
    /// restarts the move cooldown.
    pub fn move_player(&self, id: &PlayerId, dx: i32, dy: i32) -> Result<MoveOutcome, WorldError> {
        self.write(|s| s.move_player(id, dx.clamp(-1, 1), dy.clamp(-1, 1)))
    }

    /// Act on the player's own cell: pick up an item there, else harvest.
    pub fn interact(&self, id: &PlayerId) -> Result<InteractOutcome, WorldError> {
        self.write(|s| s.interact(id))
    }

    /// Attack the NPC at `at`, which must be within one cell.
    pub fn attack(&self, id: &PlayerId, at: Coord) -> Result<Option<AttackOutcome>, WorldError> {
        self.write(|s| {
            if s.reach(id, at)?.is_none() {
                return Ok(None);
            }
            let outcome = s.attack_at(id, at);
            s.see(id);
            Ok(outcome)
        })
    }

    /// Harvest the flora at `at`, which must be within one cell.
    pub fn harvest(&self, id: &PlayerId, at: Coord) -> Result<Option<HarvestOutcome>, WorldError> {
        self.write(|s| {
            if s.reach(id, at)?.is_none() {
                return Ok(None);
            }
            let outcome = s.harvest_at(id, at);
            s.see(id);
            Ok(outcome)
        })
    }

    /// Pick up the item at `at`, which must be within one cell.
    pub fn pickup(&self, id: &PlayerId, at: Coord) -> Result<Option<u32>, WorldError> {
        self.write(|s| {
            if s.reach(id, at)?.is_none() {
                return Ok(None);
            }
            let taken = s.pickup_at(id, at);
            s.see(id);
            Ok(taken)
        })
    }

    /// Use the inventory entry at `index`: food is eaten, tools are wielded.
    /// `None` when there is no such entry or the player is off the grid.
    pub fn activate_item(&self, id: &PlayerId, index: usize) -> Result<Option<ActivateOutcome>, WorldError> {
        self.write(|s| s.activate_item(id, index))
    }

    pub fn inventory(&self, id: &PlayerId) -> Result<Vec<ItemStack>, WorldError> {
        self.read(|s| s.player(id).map(|p| p.inventory.clone()).ok_or_else(|| unknown(id)))
    }

    pub fn available_recipes(&self, id: &PlayerId) -> Result<Vec<&'static Recipe>, WorldError> {
        self.read(|s| s.player(id).map(recipe::available).ok_or_else(|| unknown(id)))
    }

    /// Craft `recipe`. Returns whether anything was made.
    pub fn do_recipe(&self, id: &PlayerId, recipe: RecipeId) -> Result<bool, WorldError> {
        self.write(|s| s.do_recipe(id, recipe))
    }

    // -- Events --------------------------------------------------------------

    /// Post a chat line to the world log.
    pub fn chat(&self, class: EventClass, speaker: &str, text: &str) {
        self.write(|s| s.chat(class, speaker, text));
    }

    /// Post a line to the world log.
    pub fn announce(&self, class: EventClass, text: &str) {
        self.write(|s| s.world_event(class, text));
    }

    /// Receive the rendered world log after every world event.
    pub fn on_event(&self, id: &PlayerId, listener: impl Fn(&str) + Send + Sync + 'static) {
        let listener: Listener = Arc::new(listener);
        self.write(|s| s.event_listeners.insert(id.clone(), listener));
    }

    /// Be told when this player dies.
    pub fn on_death(&self, id: &PlayerId, listener: impl Fn(&str) + Send + Sync + 'static) {
        let listener: Listener = Arc::new(listener);
        self.write(|s| s.death_listeners.insert(id.clone(), listener));
    }

    // -- World ---------------------------------------------------------------

    pub fn spawn_npc(&self, species: NpcSpecies, at: Coord) -> Result<Handle, WorldError> {
        self.write(|s| {
            let handle = s.spawn_npc(Npc::new(species, at))?;
            s.refresh_active_npcs();
            Ok(handle)
        })
    }

    /// Place a stack on the nearest free cell around `at`.
    pub fn drop_item(&self, at: Coord, stack: ItemStack) -> Result<Coord, WorldError> {
        self.write(|s| s.drop_near(at, stack))
    }

    /// Advance the simulation to the clock's current reading.
    pub fn tick(&self) -> TickReport {
        self.write(|s| {
            let now = s.now;
            s.tick(now)
        })
    }

    // -- Inspection ----------------------------------------------------------

    pub fn player(&self, id: &PlayerId) -> Option<Player> {
        self.read(|s| s.player(id).cloned())
    }

    /// The player's observation state, readable without the world lock.
    pub fn view(&self, id: &PlayerId) -> Option<SharedView> {
        self.read(|s| s.record(id).map(|r| Arc::clone(&r.view)))
    }

    pub fn npc(&self, handle: Handle) -> Option<Npc> {
        self.read(|s| s.npc(handle).cloned())
    }

    pub fn npc_at(&self, at: Coord) -> Option<Handle> {
        self.read(|s| s.attackable(at))
    }

    pub fn item_at(&self, at: Coord) -> Option<ItemStack> {
        self.read(|s| s.pickupable(at).and_then(|h| s.items.get(h)).copied())
    }

    pub fn flora_at(&self, at: Coord) -> Option<FloraSpecies> {
        self.read(|s| s.harvestable(at).and_then(|h| s.flora.get(h)).map(|f| f.species()))
    }

    pub fn tile_at(&self, at: Coord) -> Option<Tile> {
        self.read(|s| s.grid.at(at))
    }

    /// blake3 digest of the packed grid.
    pub fn grid_digest(&self) -> String {
        self.read(|s| s.grid.digest())
    }

    pub fn active_npcs(&self) -> Vec<Handle> {
        self.read(|s| s.active_npcs.clone())
    }

    // -- Rendering -----------------------------------------------------------

    /// A `width` × `height` viewport of cells centred on the player.
    pub fn render_map(&self, id: &PlayerId, width: usize, height: usize) -> Result<RenderedMap, WorldError> {
        self.read(|s| s.render_map(id, width, height))
    }

    /// Name, body, pack and compass lines.
    pub fn render_player_sidebar(&self, id: &PlayerId) -> Result<String, WorldError> {
        self.read(|s| s.render_sidebar(id))
    }

    /// The player's recent events, oldest first.
    pub fn render_player_events(&self, id: &PlayerId) -> Result<String, WorldError> {
        self.read(|s| {
            let record = s.record(id).ok_or_else(|| unknown(id))?;
            let events = record.view.read().events.render();
            Ok(events)
        })
    }

    /// `"spring : Year 0, Day 12"`.
    pub fn render_world_status(&self) -> String {
        self.read(|s| world_status(s.days))
    }

    /// The world log, oldest first.
    pub fn world_events(&self) -> String {
        self.read(|s| s.events.render())
    }
}

fn unknown(id: &PlayerId) -> WorldError {
    WorldError::UnknownPlayer { id: id.to_string() }
}

// ---------------------------------------------------------------------------
// Session and action logic
// ---------------------------------------------------------------------------

impl WorldState {
    fn join(&mut self, id: &PlayerId, name: &str, preferred: Option<Coord>) -> Result<Coord, WorldError> {
        let known = self
            .player(id)
            .map(|p| (p.is_online(), p.dead, p.location));
        let wanted = match known {
            Some((true, _, at)) => {
                self.player_mut(id)?.name = name.to_owned();
                return Ok(at);
            }
            Some((false, false, at)) => at,
            Some((false, true, _)) | None => match preferred {
                Some(at) => at,
                None => self.random_available_coord()?,
            },
        };
        let at = if self.can_enter(wanted) {
            wanted
        } else {
            self.find_nearby_available(wanted)
                .ok_or(WorldError::NoPlacement { origin: wanted })?
        };

        let fresh = known.is_none();
        match self.registry.get_mut(id) {
            Some(record) => {
                record.player.name = name.to_owned();
                if record.player.dead {
                    record.player.revive(at);
                }
            }
            None => {
                let record = PlayerRecord::create(id.clone(), name, at, &self.config);
                self.registry.insert(id.clone(), record);
            }
        }
        if let Err(err) = self.attach_player(id, at) {
            warn!(player = %id, %at, error = %err, "join could not be placed");
            if fresh {
                self.registry.remove(id);
            }
            return Err(err);
        }

        self.see(id);
        self.refresh_active_npcs();
        info!(player = %id, %name, %at, resumed = !fresh, "player joined");
        self.world_event(EventClass::Info, format!("{name} joined."));
        Ok(at)
    }

    fn disconnect(&mut self, id: &PlayerId) -> Result<(), WorldError> {
        let name = self.player(id).ok_or_else(|| unknown(id))?.name.clone();
        self.detach_player(id);
        self.event_listeners.remove(id);
        self.death_listeners.remove(id);
        self.refresh_active_npcs();
        info!(player = %id, %name, "player left");
        self.world_event(EventClass::Warning, format!("{name} left."));
        Ok(())
    }

    /// Check that the player can act now, and start their cooldown if so.
    fn begin_action(&mut self, id: &PlayerId) -> Result<Readiness, WorldError> {
        let now = self.now;
        let cooldown = self.config.move_cooldown();
        let player = self.player_mut(id)?;
        if !player.is_online() || player.dead {
            return Ok(Readiness::Inactive);
        }
        if !player.can_move(now, cooldown) {
            return Ok(Readiness::Cooldown);
        }
        player.last_moved = Some(now);
        Ok(Readiness::Ready(player.location))
    }

    /// Start an action on `at` if it is within one cell of the player.
    fn reach(&mut self, id: &PlayerId, at: Coord) -> Result<Option<Coord>, WorldError> {
        let from = self.player(id).ok_or_else(|| unknown(id))?.location;
        if from.chebyshev(at) > 1 {
            return Ok(None);
        }
        match self.begin_action(id)? {
            Readiness::Ready(from) => Ok(Some(from)),
            Readiness::Cooldown | Readiness::Inactive => Ok(None),
        }
    }

    fn move_player(&mut self, id: &PlayerId, dx: i32, dy: i32) -> Result<MoveOutcome, WorldError> {
        let from = match self.begin_action(id)? {
            Readiness::Ready(from) => from,
            Readiness::Cooldown => return Ok(MoveOutcome::Cooldown),
            Readiness::Inactive => return Ok(MoveOutcome::Inactive),
        };
        let to = from.offset(dx, dy);
        if to == from || !self.grid.in_bounds(to) {
            return Ok(MoveOutcome::Blocked);
        }
        let outcome = if let Some(attack) = self.attack_at(id, to) {
            MoveOutcome::Attacked(attack)
        } else if self.step_player(id, to) {
            self.refresh_active_npcs();
            MoveOutcome::Moved(to)
        } else if !self.walkable(to) {
            match self.harvest_at(id, to) {
                Some(harvest) => MoveOutcome::Harvested(harvest),
                None => MoveOutcome::Blocked,
            }
        } else {
            MoveOutcome::Blocked
        };
        if !matches!(outcome, MoveOutcome::Blocked) {
            self.see(id);
        }
        Ok(outcome)
    }

    fn interact(&mut self, id: &PlayerId) -> Result<InteractOutcome, WorldError> {
        let at = match self.begin_action(id)? {
            Readiness::Ready(at) => at,
            Readiness::Cooldown => return Ok(InteractOutcome::Cooldown),
            Readiness::Inactive => return Ok(InteractOutcome::Inactive),
        };
        let outcome = if let Some(taken) = self.pickup_at(id, at) {
            InteractOutcome::PickedUp(taken)
        } else if let Some(harvest) = self.harvest_at(id, at) {
            InteractOutcome::Harvested(harvest)
        } else {
            InteractOutcome::Nothing
        };
        self.see(id);
        Ok(outcome)
    }

    fn activate_item(&mut self, id: &PlayerId, index: usize) -> Result<Option<ActivateOutcome>, WorldError> {
        let player = self.player_mut(id)?;
        if !player.is_online() {
            return Ok(None);
        }
        let Some(kind) = player.inventory.get(index).map(|s| s.kind) else {
            return Ok(None);
        };
        let outcome = if kind.has_trait(ItemTraits::EDIBLE) {
            match player.eat(kind) {
                Some(relief) => ActivateOutcome::Ate { kind, relief },
                None => ActivateOutcome::Unusable(kind),
            }
        } else if kind.is_tool() {
            player.wielding = kind;
            ActivateOutcome::Wielded(kind)
        } else {
            ActivateOutcome::Unusable(kind)
        };
        let (class, text) = match outcome {
            ActivateOutcome::Ate { kind, .. } => (EventClass::Info, format!("You ate the {kind}")),
            ActivateOutcome::Wielded(kind) => (EventClass::Info, format!("You are now wielding the {kind}")),
            ActivateOutcome::Unusable(kind) => (EventClass::Warning, format!("You can't use the {kind} on its own")),
        };
        self.player_event(id, class, text);
        debug!(player = %id, ?outcome, "item activated");
        Ok(Some(outcome))
    }

    fn do_recipe(&mut self, id: &PlayerId, recipe: RecipeId) -> Result<bool, WorldError> {
        let Some(recipe) = Recipe::find(recipe) else {
            self.player(id).ok_or_else(|| unknown(id))?;
            self.player_event(id, EventClass::Warning, "There is no such recipe");
            return Ok(false);
        };
        let made = recipe.make(self.player_mut(id)?);
        if made {
            self.player_event(id, EventClass::Success, format!("You made 1 x {}", recipe.result));
        } else {
            self.player_event(
                id,
                EventClass::Warning,
                format!("You need {} to make {}", recipe.description(), recipe.result),
            );
        }
        debug!(player = %id, recipe = recipe.id.0, made, "recipe");
        Ok(made)
    }

    // -- Render queries ------------------------------------------------------

    fn render_map(&self, id: &PlayerId, width: usize, height: usize) -> Result<RenderedMap, WorldError> {
        let record = self.record(id).ok_or_else(|| unknown(id))?;
        let centre = record.player.location;
        let view = record.view.read();
        let left = centre.x - (width / 2) as i32;
        let top = centre.y - (height / 2) as i32;
        let rows = (0..height as i32)
            .map(|dy| {
                (0..width as i32)
                    .map(|dx| self.render_cell(Coord::new(left + dx, top + dy), &view))
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(RenderedMap { width, height, rows })
    }

    fn render_cell(&self, c: Coord, view: &PlayerView) -> RenderedCell {
        if let (Some(distance), Some(tile), Some(shown)) = (view.can_see(c), self.grid.at(c), self.appearance(c)) {
            let ground = biome_appearance(tile.biome(), c);
            return RenderedCell {
                coord: c,
                glyph: shown.glyph,
                fg: foreground(shown.color, distance),
                bg: background(ground.color, distance),
                tier: Tier::Visible { distance },
            };
        }
        match view.memory.get(&c) {
            Some(memory) => RenderedCell::remembered(c, memory),
            None => RenderedCell::unknown(c),
        }
    }

    fn render_sidebar(&self, id: &PlayerId) -> Result<String, WorldError> {
        let record = self.record(id).ok_or_else(|| unknown(id))?;
        let me = &record.player;
        let mut out = String::new();
        out.push_str(&format!("{}\n", me.name));
        out.push_str(&format!("Pack: {:.1} / {}\n", me.carrying, me.max_carry as i64));
        out.push_str(&format!("Health: {} / {}\n", me.health, me.max_health));
        out.push_str(&format!("Hunger: {:.3}\n", me.hunger));
        out.push('\n');
        out.push_str(&format!("Wielding: {}\n", me.wielding));
        out.push('\n');

        if let Some(activity) = &record.view.read().activity {
            out.push_str(&format!("{}\n", activity.description));
            out.push_str(&format!("{}\n", progress_bar(activity.progress, ACTIVITY_BAR_WIDTH)));
        }
        for other in self.present_players().filter(|p| p.id != me.id) {
            out.push_str(&format!("{} {}\n", compass_indicator(me.location, other.location), other.name));
        }
        out.push('\n');
        for npc in self.active_npcs.iter().filter_map(|&h| self.npcs.get(h)) {
            out.push_str(&format!("{} {}\n", compass_indicator(me.location, npc.location), npc.species));
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
