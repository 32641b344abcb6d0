//! Player payloads.
//!
//! A [`Player`] outlives its grid presence: disconnecting frees the arena
//! slot and clears the tile, but the record (location, inventory, health)
//! stays in the world's registry so a reconnect resumes where it left off.
//!
//! What a player sees and remembers lives in a separate [`PlayerView`]
//! behind its own lock, so renderers can read it while the world is busy.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use taiga_grid::arena::Handle;
use taiga_grid::coord::Coord;

use crate::config::EngineConfig;
use crate::events::EventLog;
use crate::fov::VisibleSet;
use crate::item::{ItemKind, ItemStack, ItemTraits};
use crate::render::Appearance;

/// Hunger accrued per second of world time.
const HUNGER_PER_SECOND: f64 = 1.0 / 3600.0;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Opaque identifier supplied by the session layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayerView
// ---------------------------------------------------------------------------

/// A long-running action shown in the sidebar.
#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    pub description: String,
    /// `0.0..=1.0`.
    pub progress: f64,
}

/// Per-player observation state.
#[derive(Debug, Default)]
pub struct PlayerView {
    /// Cells in sight and their normalized distance.
    pub visible: VisibleSet,
    /// Last appearance of every cell ever seen. Never evicted.
    pub memory: HashMap<Coord, Appearance>,
    pub events: EventLog,
    pub activity: Option<Activity>,
}

impl PlayerView {
    pub fn new(event_log_len: usize) -> Self {
        Self {
            events: EventLog::new(event_log_len),
            ..Default::default()
        }
    }

    /// Normalized distance of `c` if it is in sight.
    pub fn can_see(&self, c: Coord) -> Option<f64> {
        self.visible.get(&c).copied()
    }
}

pub type SharedView = Arc<RwLock<PlayerView>>;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player's persistent state.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Last known location; kept across disconnects.
    pub location: Coord,
    /// Arena slot while on the grid.
    pub slot: Option<Handle>,
    pub health: i32,
    pub max_health: i32,
    pub hunger: f64,
    pub carrying: f64,
    pub max_carry: f64,
    /// Stacks in pickup order, one per kind.
    pub inventory: Vec<ItemStack>,
    pub wielding: ItemKind,
    pub dead: bool,
    pub last_moved: Option<Duration>,
    pub last_tick: Option<Duration>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, location: Coord, config: &EngineConfig) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            slot: None,
            health: config.player_max_health,
            max_health: config.player_max_health,
            hunger: 0.0,
            carrying: 0.0,
            max_carry: config.max_carry,
            inventory: Vec::new(),
            wielding: ItemKind::BareHands,
            dead: false,
            last_moved: None,
            last_tick: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether the move cooldown has elapsed.
    pub fn can_move(&self, now: Duration, cooldown: Duration) -> bool {
        self.last_moved
            .map_or(true, |last| now.saturating_sub(last) >= cooldown)
    }

    /// First glyph column on the map: the first character of the name.
    pub fn glyph(&self) -> String {
        let initial = self.name.chars().next().unwrap_or('@');
        format!(" {initial}")
    }

    pub fn count(&self, kind: ItemKind) -> u32 {
        self.inventory
            .iter()
            .find(|s| s.kind == kind)
            .map_or(0, |s| s.quantity)
    }

    /// Take as much of `stack` as carrying capacity allows and return how
    /// many units were taken.
    pub fn pick_up(&mut self, stack: ItemStack) -> u32 {
        let weight = stack.kind.weight();
        let taken = if weight <= 0.0 {
            stack.quantity
        } else {
            let room = ((self.max_carry - self.carrying) / weight).floor().max(0.0);
            // `room` is bounded by max_carry / weight; saturate anyway.
            (room.min(f64::from(u32::MAX)) as u32).min(stack.quantity)
        };
        if taken == 0 {
            return 0;
        }
        match self.inventory.iter_mut().find(|s| s.kind == stack.kind) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(taken),
            None => self.inventory.push(ItemStack::new(stack.kind, taken)),
        }
        self.carrying += f64::from(taken) * weight;
        taken
    }

    /// Remove `quantity` units of `kind`. Returns false, changing nothing,
    /// when the inventory holds fewer.
    pub fn remove_items(&mut self, kind: ItemKind, quantity: u32) -> bool {
        let Some(pos) = self.inventory.iter().position(|s| s.kind == kind) else {
            return quantity == 0;
        };
        let stack = &mut self.inventory[pos];
        if stack.quantity < quantity {
            return false;
        }
        stack.quantity -= quantity;
        if stack.quantity == 0 {
            self.inventory.remove(pos);
            if self.wielding == kind {
                self.wielding = ItemKind::BareHands;
            }
        }
        self.carrying = (self.carrying - f64::from(quantity) * kind.weight()).max(0.0);
        true
    }

    /// Add items produced in place (recipes), ignoring carrying capacity.
    pub fn add_items(&mut self, stack: ItemStack) {
        match self.inventory.iter_mut().find(|s| s.kind == stack.kind) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(stack.quantity),
            None => self.inventory.push(stack),
        }
        self.carrying += stack.weight();
    }

    /// Eat one unit of `kind`. Returns the hunger removed, or `None` when
    /// the item is not edible or not held.
    pub fn eat(&mut self, kind: ItemKind) -> Option<f64> {
        if !kind.has_trait(ItemTraits::EDIBLE) || !self.remove_items(kind, 1) {
            return None;
        }
        let before = self.hunger;
        self.hunger = (self.hunger - kind.spec().nutrition).max(0.0);
        Some(before - self.hunger)
    }

    /// Returns true when this blow killed the player.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        self.health -= damage;
        self.health <= 0
    }

    /// Passive per-tick update.
    pub fn tick(&mut self, now: Duration) {
        if let Some(last) = self.last_tick {
            self.hunger += now.saturating_sub(last).as_secs_f64() * HUNGER_PER_SECOND;
        }
        self.last_tick = Some(now);
    }

    /// Reset a dead player for a fresh start at `location`.
    pub fn revive(&mut self, location: Coord) {
        self.location = location;
        self.health = self.max_health;
        self.hunger = 0.0;
        self.carrying = 0.0;
        self.inventory.clear();
        self.wielding = ItemKind::BareHands;
        self.dead = false;
        self.last_moved = None;
    }
}

/// A registry entry: the player plus their observation state.
#[derive(Clone, Debug)]
pub struct PlayerRecord {
    pub player: Player,
    pub view: SharedView,
}

impl PlayerRecord {
    pub fn new(player: Player, event_log_len: usize) -> Self {
        Self {
            player,
            view: Arc::new(RwLock::new(PlayerView::new(event_log_len))),
        }
    }
}
