//! The world's mutable state and its mutation primitives.
//!
//! [`WorldState`] owns the packed grid, the four arenas and the player
//! registry. It is only ever reached through the [`World`](crate::world::World)
//! lock, so every method here runs inside one critical section: a method
//! either leaves grid and arenas consistent or changes nothing.
//!
//! The grid is the spatial index ("what is at this cell") and each player
//! and NPC payload carries its own location ("where is this entity"). Every
//! primitive that moves, spawns or despawns an agent updates both.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use taiga_grid::arena::{Arena, Handle};
use taiga_grid::coord::{Coord, Rect};
use taiga_grid::grid::Grid;
use taiga_grid::tile::{SlotKind, Tile};
use taiga_grid::GridError;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::events::{EventClass, EventLog};
use crate::flora::{Flora, HarvestOutcome};
use crate::fov::{self, Opacity};
use crate::item::ItemStack;
use crate::npc::{AttackOutcome, Npc};
use crate::player::{Activity, Player, PlayerId, PlayerRecord};
use crate::render::{biome_appearance, Appearance, Rgb, PLAYER_COLOR};
use crate::worldgen::WorldSeed;
use crate::WorldError;

/// Callback receiving rendered text: the world log, or a death notice.
pub type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// A callback invocation queued while the lock is held.
pub(crate) struct Delivery {
    pub(crate) listener: Listener,
    pub(crate) message: String,
}

// ---------------------------------------------------------------------------
// Occupant
// ---------------------------------------------------------------------------

/// One resolved occupant of a cell.
#[derive(Clone, Copy, Debug)]
pub enum Occupant<'a> {
    Player(Handle, &'a PlayerId),
    Npc(Handle, &'a Npc),
    Item(Handle, &'a ItemStack),
    Flora(Handle, &'a Flora),
}

impl Occupant<'_> {
    /// Agents never block walkability; `occupied` covers them.
    pub fn walkable(&self) -> bool {
        match self {
            Occupant::Flora(_, f) => f.walkable(),
            Occupant::Player(..) | Occupant::Npc(..) | Occupant::Item(..) => true,
        }
    }

    pub fn see_through(&self) -> bool {
        match self {
            Occupant::Flora(_, f) => f.see_through(),
            Occupant::Player(..) | Occupant::Npc(..) | Occupant::Item(..) => true,
        }
    }

    /// A living agent that excludes other agents from the cell.
    pub fn is_agent(&self) -> bool {
        matches!(self, Occupant::Player(..) | Occupant::Npc(..))
    }
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

pub struct WorldState {
    pub(crate) config: EngineConfig,
    pub(crate) grid: Grid,
    pub(crate) players: Arena<PlayerId>,
    pub(crate) npcs: Arena<Npc>,
    pub(crate) items: Arena<ItemStack>,
    pub(crate) flora: Arena<Flora>,
    pub(crate) registry: BTreeMap<PlayerId, PlayerRecord>,
    /// NPCs near at least one player, in handle order.
    pub(crate) active_npcs: Vec<Handle>,
    pub(crate) events: EventLog,
    /// World age in days.
    pub(crate) days: f64,
    pub(crate) last_tick: Option<Duration>,
    /// Clock reading for the operation in progress.
    pub(crate) now: Duration,
    pub(crate) rng: Pcg64,
    pub(crate) outbox: Vec<Delivery>,
    pub(crate) event_listeners: BTreeMap<PlayerId, Listener>,
    pub(crate) death_listeners: BTreeMap<PlayerId, Listener>,
}

impl WorldState {
    /// Build the grid and arenas from a seed.
    ///
    /// The seed's size decides the grid; `config.world_size` is overwritten
    /// to match. Placements on water, off the grid, or on a cell that already
    /// holds an entity of the same kind are skipped, as are placements that
    /// no longer fit an arena.
    pub fn from_seed(mut config: EngineConfig, seed: &WorldSeed) -> Result<Self, WorldError> {
        config.validate()?;
        let expected = (seed.size.max(0) as usize).pow(2);
        if seed.biomes.len() != expected {
            return Err(WorldError::SeedSizeMismatch {
                expected,
                actual: seed.biomes.len(),
            });
        }
        config.world_size = seed.size;

        let mut grid = Grid::new(seed.size, seed.size);
        for (i, &biome) in seed.biomes.iter().enumerate() {
            if let Some(c) = grid.coord_of(i) {
                grid.write(c, Tile::new(biome));
            }
        }

        let mut state = Self {
            players: Arena::with_capacity(config.player_capacity),
            npcs: Arena::with_capacity(config.npc_capacity),
            items: Arena::with_capacity(config.item_capacity),
            flora: Arena::with_capacity(config.flora_capacity),
            registry: BTreeMap::new(),
            active_npcs: Vec::new(),
            events: EventLog::new(config.world_event_log_len),
            days: 0.0,
            last_tick: None,
            now: Duration::ZERO,
            rng: Pcg64::seed_from_u64(config.seed),
            outbox: Vec::new(),
            event_listeners: BTreeMap::new(),
            death_listeners: BTreeMap::new(),
            grid,
            config,
        };

        let mut skipped = 0usize;
        for &(c, species) in &seed.flora {
            if !state.is_dry(c) || state.slot_at(c, SlotKind::Flora).is_some() {
                skipped += 1;
                continue;
            }
            if let Err(err) = state.add_flora(c, Flora::new(species)) {
                warn!(%c, ?species, error = %err, "flora placement dropped");
                skipped += 1;
            }
        }
        for &(c, species) in &seed.npcs {
            if !state.walkable(c) || state.occupied(c) {
                skipped += 1;
                continue;
            }
            if let Err(err) = state.spawn_npc(Npc::new(species, c)) {
                warn!(%c, ?species, error = %err, "npc placement dropped");
                skipped += 1;
            }
        }
        for &(c, stack) in &seed.items {
            if !state.is_dry(c) || state.slot_at(c, SlotKind::Item).is_some() {
                skipped += 1;
                continue;
            }
            if let Err(err) = state.add_item(c, stack) {
                warn!(%c, %stack, error = %err, "item placement dropped");
                skipped += 1;
            }
        }

        info!(
            size = seed.size,
            flora = state.flora.len(),
            npcs = state.npcs.len(),
            items = state.items.len(),
            skipped,
            "world created"
        );
        Ok(state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn days(&self) -> f64 {
        self.days
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn active_npcs(&self) -> &[Handle] {
        &self.active_npcs
    }

    pub fn npc(&self, handle: Handle) -> Option<&Npc> {
        self.npcs.get(handle)
    }

    pub fn npcs(&self) -> impl Iterator<Item = (Handle, &Npc)> {
        self.npcs.iter()
    }

    pub fn record(&self, id: &PlayerId) -> Option<&PlayerRecord> {
        self.registry.get(id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.registry.get(id).map(|r| &r.player)
    }

    pub(crate) fn player_mut(&mut self, id: &PlayerId) -> Result<&mut Player, WorldError> {
        self.registry
            .get_mut(id)
            .map(|r| &mut r.player)
            .ok_or_else(|| WorldError::UnknownPlayer { id: id.to_string() })
    }

    // -- Cell queries --------------------------------------------------------

    /// Handle in the `kind` field of `c`, if it resolves to a live entry.
    pub fn slot_at(&self, c: Coord, kind: SlotKind) -> Option<Handle> {
        let handle = self.grid.at(c)?.slot(kind)?;
        let live = match kind {
            SlotKind::Player => self.players.contains(handle),
            SlotKind::Npc => self.npcs.contains(handle),
            SlotKind::Item => self.items.contains(handle),
            SlotKind::Flora => self.flora.contains(handle),
        };
        live.then_some(handle)
    }

    /// Occupants of `c` in precedence order: player, NPC, item, flora.
    pub fn occupants(&self, c: Coord) -> impl Iterator<Item = Occupant<'_>> + '_ {
        self.grid.at(c).into_iter().flat_map(move |tile| {
            SlotKind::ALL.into_iter().filter_map(move |kind| {
                let h = tile.slot(kind)?;
                match kind {
                    SlotKind::Player => self.players.get(h).map(|p| Occupant::Player(h, p)),
                    SlotKind::Npc => self.npcs.get(h).map(|n| Occupant::Npc(h, n)),
                    SlotKind::Item => self.items.get(h).map(|i| Occupant::Item(h, i)),
                    SlotKind::Flora => self.flora.get(h).map(|f| Occupant::Flora(h, f)),
                }
            })
        })
    }

    /// On the grid and not water.
    fn is_dry(&self, c: Coord) -> bool {
        self.grid.at(c).is_some_and(|t| !t.biome().is_water())
    }

    /// Terrain and flora allow standing here. Off-grid is never walkable.
    pub fn walkable(&self, c: Coord) -> bool {
        self.is_dry(c) && self.occupants(c).all(|o| o.walkable())
    }

    /// Something here blocks sight.
    pub fn opaque(&self, c: Coord) -> bool {
        self.occupants(c).any(|o| !o.see_through())
    }

    /// A player or NPC stands here.
    pub fn occupied(&self, c: Coord) -> bool {
        self.occupants(c).any(|o| o.is_agent())
    }

    pub fn attackable(&self, c: Coord) -> Option<Handle> {
        self.slot_at(c, SlotKind::Npc)
    }

    pub fn pickupable(&self, c: Coord) -> Option<Handle> {
        self.slot_at(c, SlotKind::Item)
    }

    pub fn harvestable(&self, c: Coord) -> Option<Handle> {
        self.slot_at(c, SlotKind::Flora)
    }

    /// What a cell looks like right now: the first occupant by precedence,
    /// else the ground.
    pub fn appearance(&self, c: Coord) -> Option<Appearance> {
        let tile = self.grid.at(c)?;
        let shown = self.occupants(c).next().map(|o| match o {
            Occupant::Player(_, id) => {
                let glyph = self
                    .registry
                    .get(id)
                    .map_or_else(|| " ?".to_owned(), |r| r.player.glyph());
                Appearance::new(glyph, PLAYER_COLOR)
            }
            Occupant::Npc(_, npc) => Appearance::new(npc.glyph(), Rgb::from_catalog(npc.spec().color)),
            Occupant::Item(_, stack) => {
                let spec = stack.kind.spec();
                Appearance::new(spec.glyph, Rgb::from_catalog(spec.color))
            }
            Occupant::Flora(_, flora) => {
                let spec = flora.spec();
                Appearance::new(spec.glyph, Rgb::from_catalog(spec.color))
            }
        });
        Some(shown.unwrap_or_else(|| biome_appearance(tile.biome(), c)))
    }

    /// What a player remembers of a cell: flora, else item, else the ground.
    /// Agents move, so they are never remembered.
    pub fn memory_appearance(&self, c: Coord) -> Option<Appearance> {
        let tile = self.grid.at(c)?;
        let lasting = self
            .occupants(c)
            .filter_map(|o| match o {
                Occupant::Flora(_, f) => Some((0, f.spec().glyph, f.spec().color)),
                Occupant::Item(_, s) => Some((1, s.kind.spec().glyph, s.kind.spec().color)),
                Occupant::Player(..) | Occupant::Npc(..) => None,
            })
            .min_by_key(|&(rank, ..)| rank)
            .map(|(_, glyph, color)| Appearance::new(glyph, Rgb::from_catalog(color)));
        Some(lasting.unwrap_or_else(|| biome_appearance(tile.biome(), c)))
    }

    // -- Grid slot writes ----------------------------------------------------

    /// Store `handle` in the `kind` field of `c`. `Ok(false)` off-grid.
    fn write_slot(&mut self, c: Coord, kind: SlotKind, handle: Option<Handle>) -> Result<bool, GridError> {
        let Some(tile) = self.grid.at(c) else {
            return Ok(false);
        };
        let tile = tile.with_slot(kind, handle)?;
        Ok(self.grid.write(c, tile))
    }

    /// Clear the `kind` field of `c` if it still holds `handle`.
    fn clear_slot(&mut self, c: Coord, kind: SlotKind, handle: Handle) {
        if self.grid.at(c).and_then(|t| t.slot(kind)) == Some(handle) {
            // Clearing writes zero, which always fits.
            if let Err(err) = self.write_slot(c, kind, None) {
                warn!(%c, %kind, error = %err, "failed to clear slot");
            }
        }
    }

    /// Move an agent's slot from `from` to `to`. The caller has checked the
    /// destination.
    fn relocate(&mut self, kind: SlotKind, handle: Handle, from: Coord, to: Coord) -> bool {
        match self.write_slot(to, kind, Some(handle)) {
            Ok(true) => {
                self.clear_slot(from, kind, handle);
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!(%to, %kind, error = %err, "relocation rejected");
                false
            }
        }
    }

    pub(crate) fn can_enter(&self, c: Coord) -> bool {
        self.walkable(c) && !self.occupied(c)
    }

    // -- Agents --------------------------------------------------------------

    /// Append an NPC and place it at its location.
    pub fn spawn_npc(&mut self, npc: Npc) -> Result<Handle, WorldError> {
        let at = npc.location;
        if !self.can_enter(at) {
            return Err(WorldError::NoPlacement { origin: at });
        }
        let handle = self.npcs.append(npc)?;
        if let Err(err) = self.write_slot(at, SlotKind::Npc, Some(handle)) {
            self.npcs.remove(handle);
            return Err(err.into());
        }
        Ok(handle)
    }

    /// Move an NPC one cell. Rejected moves change nothing.
    pub fn move_npc(&mut self, handle: Handle, to: Coord) -> bool {
        let Some(from) = self.npcs.get(handle).map(|n| n.location) else {
            return false;
        };
        if from == to || !self.can_enter(to) || !self.relocate(SlotKind::Npc, handle, from, to) {
            return false;
        }
        if let Some(npc) = self.npcs.get_mut(handle) {
            npc.location = to;
        }
        true
    }

    /// Remove an NPC from grid, arena and the active set.
    pub fn remove_npc(&mut self, handle: Handle) -> Option<Npc> {
        let at = self.npcs.get(handle)?.location;
        self.clear_slot(at, SlotKind::Npc, handle);
        self.active_npcs.retain(|&h| h != handle);
        self.npcs.remove(handle)
    }

    /// Move a player by `to - location`. Rejected moves change nothing.
    pub(crate) fn step_player(&mut self, id: &PlayerId, to: Coord) -> bool {
        let Some((handle, from)) = self
            .registry
            .get(id)
            .and_then(|r| r.player.slot.map(|h| (h, r.player.location)))
        else {
            return false;
        };
        if !self.can_enter(to) || !self.relocate(SlotKind::Player, handle, from, to) {
            return false;
        }
        if let Some(record) = self.registry.get_mut(id) {
            record.player.location = to;
        }
        debug!(player = %id, %from, %to, "player moved");
        true
    }

    /// Put a registered player on the grid at `at`.
    pub(crate) fn attach_player(&mut self, id: &PlayerId, at: Coord) -> Result<Handle, WorldError> {
        if !self.registry.contains_key(id) {
            return Err(WorldError::UnknownPlayer { id: id.to_string() });
        }
        let handle = self.players.append(id.clone())?;
        match self.write_slot(at, SlotKind::Player, Some(handle)) {
            Ok(true) => {}
            Ok(false) => {
                self.players.remove(handle);
                return Err(WorldError::NoPlacement { origin: at });
            }
            Err(err) => {
                self.players.remove(handle);
                return Err(err.into());
            }
        }
        let player = self.player_mut(id)?;
        player.slot = Some(handle);
        player.location = at;
        player.last_tick = None;
        Ok(handle)
    }

    /// Take a player off the grid, keeping the registry record.
    pub(crate) fn detach_player(&mut self, id: &PlayerId) {
        let Some(record) = self.registry.get_mut(id) else {
            return;
        };
        let Some(handle) = record.player.slot.take() else {
            return;
        };
        let at = record.player.location;
        self.clear_slot(at, SlotKind::Player, handle);
        self.players.remove(handle);
    }

    /// Players currently on the grid.
    pub fn present_players(&self) -> impl Iterator<Item = &Player> {
        self.registry
            .values()
            .map(|r| &r.player)
            .filter(|p| p.is_online() && !p.dead)
    }

    // -- Items and flora -----------------------------------------------------

    /// Append a stack and place it at `c`. A cell holds at most one stack, so
    /// an occupied item slot is refused before anything is appended.
    pub fn add_item(&mut self, c: Coord, stack: ItemStack) -> Result<Handle, WorldError> {
        if !self.grid.in_bounds(c) || self.slot_at(c, SlotKind::Item).is_some() {
            return Err(WorldError::NoPlacement { origin: c });
        }
        let handle = self.items.append(stack)?;
        if let Err(err) = self.write_slot(c, SlotKind::Item, Some(handle)) {
            self.items.remove(handle);
            return Err(err.into());
        }
        Ok(handle)
    }

    /// Place a stack on the nearest free cell around `origin`.
    pub fn drop_near(&mut self, origin: Coord, stack: ItemStack) -> Result<Coord, WorldError> {
        let at = self
            .find_nearby_available(origin)
            .ok_or(WorldError::NoPlacement { origin })?;
        self.add_item(at, stack)?;
        Ok(at)
    }

    pub fn remove_item_at(&mut self, c: Coord) -> Option<ItemStack> {
        let handle = self.pickupable(c)?;
        self.clear_slot(c, SlotKind::Item, handle);
        self.items.remove(handle)
    }

    fn add_flora(&mut self, c: Coord, flora: Flora) -> Result<Handle, WorldError> {
        let handle = self.flora.append(flora)?;
        if let Err(err) = self.write_slot(c, SlotKind::Flora, Some(handle)) {
            self.flora.remove(handle);
            return Err(err.into());
        }
        Ok(handle)
    }

    pub fn remove_flora_at(&mut self, c: Coord) -> Option<Flora> {
        let handle = self.harvestable(c)?;
        self.clear_slot(c, SlotKind::Flora, handle);
        self.flora.remove(handle)
    }

    // -- Placement searches --------------------------------------------------

    /// Breadth-first search over 4-neighbours from `origin` (inclusive) for
    /// a walkable cell with no agent and no item. Visits each cell at most
    /// once, so it ends after at most one pass over the grid.
    pub fn find_nearby_available(&self, origin: Coord) -> Option<Coord> {
        let mut seen = vec![false; self.grid.len()];
        let mut queue = std::collections::VecDeque::new();
        let start = self.grid.index(origin)?;
        seen[start] = true;
        queue.push_back(origin);
        while let Some(c) = queue.pop_front() {
            if self.can_enter(c) && self.pickupable(c).is_none() {
                return Some(c);
            }
            for n in c.orthogonal_neighbors() {
                if let Some(i) = self.grid.index(n) {
                    if !seen[i] {
                        seen[i] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        None
    }

    /// Probe random cells for a walkable, unoccupied one.
    pub fn random_available_coord(&mut self) -> Result<Coord, WorldError> {
        let attempts = self.config.spawn_attempts;
        let (w, h) = (self.grid.width(), self.grid.height());
        if w > 0 && h > 0 {
            for _ in 0..attempts {
                let c = Coord::new(self.rng.gen_range(0..w), self.rng.gen_range(0..h));
                if self.can_enter(c) {
                    return Ok(c);
                }
            }
        }
        Err(WorldError::NoSpawn { attempts })
    }

    // -- Activation and sight ------------------------------------------------

    /// Recompute the active NPC set: every NPC within the activation box of
    /// any present player.
    pub fn refresh_active_npcs(&mut self) {
        let radius = self.config.activation_radius;
        let mut found = BTreeSet::new();
        for player in self.present_players() {
            for (_, tile) in self.grid.within(Rect::around(player.location, radius)) {
                if let Some(h) = tile.slot(SlotKind::Npc) {
                    if self.npcs.contains(h) {
                        found.insert(h);
                    }
                }
            }
        }
        self.active_npcs = found.into_iter().collect();
    }

    /// Recompute a player's visible set and fold it into their memory.
    pub fn see(&self, id: &PlayerId) {
        let Some(record) = self.registry.get(id) else {
            return;
        };
        if !record.player.is_online() {
            return;
        }
        let visible = fov::compute(self, record.player.location, self.config.fov_radius);
        let mut view = record.view.write();
        for &c in visible.keys() {
            if let Some(appearance) = self.memory_appearance(c) {
                view.memory.insert(c, appearance);
            }
        }
        view.visible = visible;
    }

    // -- Events --------------------------------------------------------------

    pub(crate) fn player_event(&self, id: &PlayerId, class: EventClass, text: impl Into<String>) {
        if let Some(record) = self.registry.get(id) {
            record.view.write().events.push(class, text, self.now);
        }
    }

    fn set_activity(&self, id: &PlayerId, activity: Activity) {
        if let Some(record) = self.registry.get(id) {
            record.view.write().activity = Some(activity);
        }
    }

    fn broadcast(&mut self) {
        let rendered = self.events.render();
        for listener in self.event_listeners.values() {
            self.outbox.push(Delivery {
                listener: Arc::clone(listener),
                message: rendered.clone(),
            });
        }
    }

    /// Append to the world log and notify every listener.
    pub fn world_event(&mut self, class: EventClass, text: impl Into<String>) {
        self.events.push(class, text, self.now);
        self.broadcast();
    }

    /// A chat line in the world log.
    pub fn chat(&mut self, class: EventClass, speaker: &str, text: &str) {
        self.events.push_with_subject(class, text, speaker, self.now);
        self.broadcast();
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    // -- Interactions --------------------------------------------------------

    /// The player attacks the NPC at `c` with their wielded item.
    pub(crate) fn attack_at(&mut self, id: &PlayerId, c: Coord) -> Option<AttackOutcome> {
        let handle = self.attackable(c)?;
        let weapon = self.player(id)?.wielding;
        let npc = self.npcs.get_mut(handle)?;
        let name = npc.species.name();
        let outcome = npc.attacked(weapon, id.clone());
        debug!(player = %id, npc = %handle, ?outcome, "attack");
        match &outcome {
            AttackOutcome::Killed { drops, .. } => {
                self.player_event(id, EventClass::Success, format!("You killed the {name}"));
                self.remove_npc(handle);
                for &drop in drops {
                    self.player_event(id, EventClass::Success, format!("It dropped {drop}"));
                    if let Err(err) = self.drop_near(c, drop) {
                        warn!(%c, %drop, error = %err, "drop lost");
                    }
                }
            }
            AttackOutcome::Ineffective => self.player_event(
                id,
                EventClass::Warning,
                format!("Your {weapon} doesn't do anything to the {name}"),
            ),
            AttackOutcome::Hit { damage } => {
                self.player_event(id, EventClass::Success, format!("You hit the {name} for {damage}"));
            }
        }
        Some(outcome)
    }

    /// The player works the flora at `c` with their wielded item.
    pub(crate) fn harvest_at(&mut self, id: &PlayerId, c: Coord) -> Option<HarvestOutcome> {
        let handle = self.harvestable(c)?;
        let tool = self.player(id)?.wielding;
        let flora = self.flora.get_mut(handle)?;
        let name = flora.spec().name;
        let outcome = flora.harvest(tool);
        debug!(player = %id, flora = %handle, depleted = outcome.depleted, progress = outcome.progress, "harvest");

        self.set_activity(
            id,
            Activity {
                description: name.to_owned(),
                progress: outcome.progress,
            },
        );
        // A felled plant frees its cell before the yield is placed.
        if outcome.depleted {
            self.remove_flora_at(c);
        }
        for &stack in &outcome.yields {
            self.player_event(id, EventClass::Success, format!("It yielded {stack}"));
            if let Err(err) = self.drop_near(c, stack) {
                warn!(%c, %stack, error = %err, "yield lost");
            }
        }
        if outcome.depleted {
            self.player_event(id, EventClass::Success, format!("You harvested the {name}"));
        } else if !outcome.success {
            self.player_event(id, EventClass::Warning, format!("Your {tool} does not work here"));
        }
        Some(outcome)
    }

    /// The player picks up as much of the stack at `c` as they can carry.
    pub(crate) fn pickup_at(&mut self, id: &PlayerId, c: Coord) -> Option<u32> {
        let handle = self.pickupable(c)?;
        let stack = *self.items.get(handle)?;
        let taken = self.registry.get_mut(id)?.player.pick_up(stack);
        if taken == 0 {
            self.player_event(
                id,
                EventClass::Warning,
                format!("You can't carry any more {}", stack.kind),
            );
            return Some(0);
        }
        self.player_event(
            id,
            EventClass::Success,
            format!("You picked up {}", ItemStack::new(stack.kind, taken)),
        );
        if taken >= stack.quantity {
            self.remove_item_at(c);
        } else if let Some(rest) = self.items.get_mut(handle) {
            rest.quantity -= taken;
        }
        Some(taken)
    }

    /// An NPC's attack lands on a player.
    pub(crate) fn npc_attacks_player(&mut self, npc: Handle, target: &PlayerId, damage: i32) {
        let Some(name) = self.npcs.get(npc).map(|n| n.species.name()) else {
            return;
        };
        let Some(record) = self.registry.get_mut(target) else {
            return;
        };
        if damage <= 0 {
            self.player_event(target, EventClass::Warning, format!("The {name} missed!"));
            return;
        }
        let died = record.player.take_damage(damage);
        self.player_event(
            target,
            EventClass::Danger,
            format!("The {name} attacked you! You lost {damage} health"),
        );
        debug!(npc = %npc, player = %target, damage, "npc attack");
        if died {
            self.kill_player(target);
        }
    }

    /// Take a player off the grid as dead and notify.
    pub(crate) fn kill_player(&mut self, id: &PlayerId) {
        self.detach_player(id);
        let Some(record) = self.registry.get_mut(id) else {
            return;
        };
        record.player.dead = true;
        let name = record.player.name.clone();
        self.player_event(id, EventClass::Danger, "You died");
        info!(player = %id, %name, "player died");
        self.world_event(EventClass::Danger, format!("{name} died."));
        if let Some(listener) = self.death_listeners.get(id) {
            self.outbox.push(Delivery {
                listener: Arc::clone(listener),
                message: "You died".to_owned(),
            });
        }
        self.refresh_active_npcs();
    }

    // -- Tick ----------------------------------------------------------------

    /// Advance world age, run active NPC turns, then tick present players.
    pub fn tick(&mut self, now: Duration) -> TickReport {
        self.now = now;
        if let Some(last) = self.last_tick {
            self.days += now.saturating_sub(last).as_secs_f64() / self.config.seconds_per_day;
        }
        self.last_tick = Some(now);

        let mut npc_turns = 0;
        for handle in self.active_npcs.clone() {
            if self.tick_npc(handle, now) {
                npc_turns += 1;
            }
        }

        let mut players_ticked = 0;
        for record in self.registry.values_mut() {
            if record.player.is_online() {
                record.player.tick(now);
                players_ticked += 1;
            }
        }
        TickReport {
            npc_turns,
            players_ticked,
            days: self.days,
        }
    }
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    /// NPCs whose speed gate opened this tick.
    pub npc_turns: usize,
    pub players_ticked: usize,
    pub days: f64,
}

impl Opacity for WorldState {
    fn in_bounds(&self, c: Coord) -> bool {
        self.grid.in_bounds(c)
    }

    fn is_opaque(&self, c: Coord) -> bool {
        self.opaque(c)
    }
}

impl PlayerRecord {
    pub(crate) fn create(id: PlayerId, name: &str, at: Coord, config: &EngineConfig) -> Self {
        PlayerRecord::new(Player::new(id, name, at, config), config.player_event_log_len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flora::FloraSpecies;
    use crate::item::ItemKind;
    use crate::npc::NpcSpecies;
    use taiga_grid::tile::Biome;

    fn state(size: i32) -> WorldState {
        WorldState::from_seed(EngineConfig::default(), &WorldSeed::uniform(size, Biome::Boreal)).unwrap()
    }

    fn with_player(state: &mut WorldState, id: &str, at: Coord) -> PlayerId {
        let id = PlayerId::from(id);
        let record = PlayerRecord::create(id.clone(), id.as_str(), at, &state.config);
        state.registry.insert(id.clone(), record);
        state.attach_player(&id, at).unwrap();
        id
    }

    #[test]
    fn seed_size_must_match() {
        let mut seed = WorldSeed::uniform(4, Biome::Boreal);
        seed.biomes.pop();
        let err = WorldState::from_seed(EngineConfig::default(), &seed).err().unwrap();
        assert!(matches!(err, WorldError::SeedSizeMismatch { expected: 16, actual: 15 }));
    }

    #[test]
    fn water_and_trees_block_walking() {
        let mut seed = WorldSeed::uniform(5, Biome::Boreal);
        seed.biomes[0] = Biome::Ocean;
        seed.flora.push((Coord::new(2, 2), FloraSpecies::ScotsPine));
        seed.flora.push((Coord::new(3, 3), FloraSpecies::BogMyrtle));
        let s = WorldState::from_seed(EngineConfig::default(), &seed).unwrap();
        assert!(!s.walkable(Coord::new(0, 0)));
        assert!(!s.walkable(Coord::new(2, 2)));
        assert!(s.opaque(Coord::new(2, 2)));
        assert!(s.walkable(Coord::new(3, 3)));
        assert!(!s.opaque(Coord::new(3, 3)));
        assert!(!s.walkable(Coord::new(-1, 0)));
    }

    #[test]
    fn npc_moves_keep_grid_and_payload_in_step() {
        let mut s = state(6);
        let h = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(1, 1))).unwrap();
        assert!(s.move_npc(h, Coord::new(2, 1)));
        assert_eq!(s.attackable(Coord::new(2, 1)), Some(h));
        assert_eq!(s.attackable(Coord::new(1, 1)), None);
        assert_eq!(s.npc(h).map(|n| n.location), Some(Coord::new(2, 1)));
    }

    #[test]
    fn agents_exclude_each_other() {
        let mut s = state(6);
        let a = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(1, 1))).unwrap();
        s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(2, 1))).unwrap();
        let before = s.grid.digest();
        assert!(!s.move_npc(a, Coord::new(2, 1)));
        assert_eq!(s.grid.digest(), before);
        assert!(s.spawn_npc(Npc::new(NpcSpecies::BrownBear, Coord::new(2, 1))).is_err());
    }

    #[test]
    fn nearby_search_starts_at_origin_and_skips_items() {
        let mut s = state(5);
        let origin = Coord::new(2, 2);
        assert_eq!(s.find_nearby_available(origin), Some(origin));
        s.add_item(origin, ItemStack::new(ItemKind::PineWood, 1)).unwrap();
        let next = s.find_nearby_available(origin).unwrap();
        assert_eq!(next.manhattan(origin), 1);
    }

    #[test]
    fn second_stack_on_a_cell_is_refused() {
        let mut s = state(4);
        let c = Coord::new(1, 1);
        let first = s.add_item(c, ItemStack::new(ItemKind::PineWood, 1)).unwrap();
        let before = s.grid.digest();
        assert!(matches!(
            s.add_item(c, ItemStack::new(ItemKind::PineBark, 1)),
            Err(WorldError::NoPlacement { origin }) if origin == c
        ));
        assert_eq!(s.items.len(), 1);
        assert_eq!(s.slot_at(c, SlotKind::Item), Some(first));
        assert_eq!(s.grid.digest(), before);
        assert_eq!(s.remove_item_at(c), Some(ItemStack::new(ItemKind::PineWood, 1)));
        assert!(s.items.is_empty());
    }

    #[test]
    fn nearby_search_fails_on_a_full_grid() {
        let mut s = state(2);
        for c in Rect::from_corners(Coord::new(0, 0), Coord::new(1, 1)).cells() {
            s.add_item(c, ItemStack::new(ItemKind::PineBark, 1)).unwrap();
        }
        assert_eq!(s.find_nearby_available(Coord::new(0, 0)), None);
        assert!(matches!(
            s.drop_near(Coord::new(0, 0), ItemStack::new(ItemKind::PineBark, 1)),
            Err(WorldError::NoPlacement { .. })
        ));
    }

    #[test]
    fn spawn_search_gives_up() {
        let seed = WorldSeed::uniform(3, Biome::Ocean);
        let config = EngineConfig {
            spawn_attempts: 25,
            ..Default::default()
        };
        let mut s = WorldState::from_seed(config, &seed).unwrap();
        assert!(matches!(s.random_available_coord(), Err(WorldError::NoSpawn { attempts: 25 })));
    }

    #[test]
    fn active_set_is_the_union_of_player_boxes() {
        let mut s = state(60);
        let near = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(12, 10))).unwrap();
        let far = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(45, 45))).unwrap();
        with_player(&mut s, "a", Coord::new(5, 5));
        s.refresh_active_npcs();
        assert_eq!(s.active_npcs(), &[near]);
        with_player(&mut s, "b", Coord::new(50, 50));
        s.refresh_active_npcs();
        assert_eq!(s.active_npcs(), &[near, far]);
    }

    #[test]
    fn detach_clears_the_cell_but_keeps_the_record() {
        let mut s = state(6);
        let id = with_player(&mut s, "a", Coord::new(3, 3));
        assert!(s.occupied(Coord::new(3, 3)));
        s.detach_player(&id);
        assert!(!s.occupied(Coord::new(3, 3)));
        assert_eq!(s.player(&id).map(|p| p.location), Some(Coord::new(3, 3)));
        assert!(s.players.is_empty());
    }

    #[test]
    fn memory_prefers_flora_and_ignores_agents() {
        let mut seed = WorldSeed::uniform(4, Biome::Boreal);
        seed.flora.push((Coord::new(1, 1), FloraSpecies::BogMyrtle));
        let mut s = WorldState::from_seed(EngineConfig::default(), &seed).unwrap();
        s.add_item(Coord::new(1, 1), ItemStack::new(ItemKind::PineWood, 1)).unwrap();
        with_player(&mut s, "a", Coord::new(1, 1));
        assert_eq!(s.memory_appearance(Coord::new(1, 1)).map(|a| a.glyph), Some("m ".to_owned()));
        assert_eq!(s.appearance(Coord::new(1, 1)).map(|a| a.glyph), Some(" a".to_owned()));
    }

    #[test]
    fn killed_npc_drops_land_on_its_cell() {
        let mut s = state(6);
        let id = with_player(&mut s, "a", Coord::new(1, 1));
        s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(2, 1))).unwrap();
        s.registry.get_mut(&id).unwrap().player.wielding = ItemKind::StoneAxe;
        for _ in 0..2 {
            assert!(matches!(s.attack_at(&id, Coord::new(2, 1)), Some(AttackOutcome::Hit { .. })));
        }
        assert!(matches!(s.attack_at(&id, Coord::new(2, 1)), Some(AttackOutcome::Killed { .. })));
        assert!(s.attackable(Coord::new(2, 1)).is_none());
        assert_eq!(s.items.len(), 2);
        assert!(s.pickupable(Coord::new(2, 1)).is_some());
    }

    #[test]
    fn partial_pickup_leaves_the_rest() {
        let mut s = state(4);
        let id = with_player(&mut s, "a", Coord::new(1, 1));
        s.registry.get_mut(&id).unwrap().player.carrying = 48.5;
        s.add_item(Coord::new(1, 1), ItemStack::new(ItemKind::PineWood, 4)).unwrap();
        assert_eq!(s.pickup_at(&id, Coord::new(1, 1)), Some(2));
        let rest = s.pickupable(Coord::new(1, 1)).and_then(|h| s.items.get(h)).copied();
        assert_eq!(rest, Some(ItemStack::new(ItemKind::PineWood, 2)));
    }

    #[test]
    fn lethal_npc_attack_kills_and_notifies() {
        let mut s = state(6);
        let id = with_player(&mut s, "a", Coord::new(1, 1));
        let bear = s.spawn_npc(Npc::new(NpcSpecies::BrownBear, Coord::new(2, 1))).unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        s.death_listeners.insert(id.clone(), Arc::new(move |m: &str| sink.lock().push(m.to_owned())));
        s.npc_attacks_player(bear, &id, 50);
        let p = s.player(&id).unwrap();
        assert!(p.dead);
        assert!(!p.is_online());
        assert!(!s.occupied(Coord::new(1, 1)));
        for d in s.take_outbox() {
            (d.listener)(&d.message);
        }
        assert_eq!(seen.lock().as_slice(), ["You died".to_owned()]);
    }
}
