//! Non-player characters.
//!
//! An [`Npc`] is the payload stored in the NPC arena. Its behavior is chosen
//! by the species' [`Archetype`]; the per-turn state machines themselves live
//! in [`behavior`](crate::behavior) because they need the whole world.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taiga_grid::coord::Coord;

use crate::item::{ItemKind, ItemStack, ItemTraits};
use crate::mapview::MapView;
use crate::player::PlayerId;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// How a species reacts to threats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Wanders; flees once attacked.
    Defensive,
    /// Wanders; pursues and fights back once attacked.
    Aggressive,
}

/// Discrete behavioral state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Asleep,
    #[default]
    Calm,
    Hungry,
    Curious,
    Terrorized,
    Enraged,
}

/// How much an NPC cares about a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetWeight {
    Food = 1,
    Enemy = 100,
}

/// Static properties of a species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NpcSpec {
    pub name: &'static str,
    /// Single-column glyph; the second column shows mood.
    pub glyph: &'static str,
    pub color: &'static str,
    /// Fraction of ticks the NPC acts on, `1.0` being every tick.
    pub base_speed: f64,
    pub health: i32,
    /// Attack damage, rolled in `min..max`.
    pub damage: (i32, i32),
    pub archetype: Archetype,
    pub drops: &'static [(ItemKind, u32)],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcSpecies {
    Rabbit,
    BrownBear,
}

impl NpcSpecies {
    pub const ALL: [NpcSpecies; 2] = [NpcSpecies::Rabbit, NpcSpecies::BrownBear];

    pub const fn spec(self) -> NpcSpec {
        match self {
            NpcSpecies::Rabbit => NpcSpec {
                name: "rabbit",
                glyph: "r",
                color: "#D9CBB0",
                base_speed: 0.2,
                health: 30,
                damage: (0, 1),
                archetype: Archetype::Defensive,
                drops: &[(ItemKind::RawMeat, 1), (ItemKind::RabbitPelt, 1)],
            },
            NpcSpecies::BrownBear => NpcSpec {
                name: "brown bear",
                glyph: "b",
                color: "#8B5A2B",
                base_speed: 0.5,
                health: 300,
                damage: (10, 100),
                archetype: Archetype::Aggressive,
                drops: &[(ItemKind::RawMeat, 6), (ItemKind::BearPelt, 1)],
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for NpcSpecies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Npc
// ---------------------------------------------------------------------------

/// Result of a player's attack on an NPC.
#[derive(Clone, Debug, PartialEq)]
pub enum AttackOutcome {
    /// The weapon cannot hurt this NPC.
    Ineffective,
    Hit { damage: i32 },
    /// The NPC died; its drops must be placed in the world.
    Killed { damage: i32, drops: Vec<ItemStack> },
}

/// A living NPC.
#[derive(Clone, Debug)]
pub struct Npc {
    pub species: NpcSpecies,
    pub mood: Mood,
    /// Current speed; raised while fleeing or pursuing.
    pub speed: f64,
    pub health: i32,
    pub max_health: i32,
    /// Players this NPC is reacting to.
    pub targets: BTreeMap<PlayerId, TargetWeight>,
    /// Mirrors the NPC slot on the grid; every move updates both.
    pub location: Coord,
    pub last_moved: Option<Duration>,
    pub map_view: Option<MapView>,
}

impl Npc {
    pub fn new(species: NpcSpecies, location: Coord) -> Self {
        let spec = species.spec();
        Self {
            species,
            mood: Mood::default(),
            speed: spec.base_speed,
            health: spec.health,
            max_health: spec.health,
            targets: BTreeMap::new(),
            location,
            last_moved: None,
            map_view: None,
        }
    }

    pub fn spec(&self) -> NpcSpec {
        self.species.spec()
    }

    pub fn base_speed(&self) -> f64 {
        self.spec().base_speed
    }

    pub fn archetype(&self) -> Archetype {
        self.spec().archetype
    }

    /// Whether enough time has passed since the last turn. An NPC acts when
    /// more than `1 - speed` seconds have elapsed, so `speed >= 1.0` acts
    /// every tick.
    pub fn ready(&self, now: Duration) -> bool {
        match self.last_moved {
            None => true,
            Some(last) => now.saturating_sub(last).as_secs_f64() > 1.0 - self.speed,
        }
    }

    /// Drop the pathfinding view and every target.
    pub fn forget_targets(&mut self) {
        self.targets.clear();
        self.map_view = None;
    }

    /// Apply an attack by `attacker` wielding `weapon`.
    ///
    /// Any attack, even an ineffective one, records the attacker as an enemy
    /// and puts the NPC in its threatened mood.
    pub fn attacked(&mut self, weapon: ItemKind, attacker: PlayerId) -> AttackOutcome {
        self.mood = match self.archetype() {
            Archetype::Defensive => Mood::Terrorized,
            Archetype::Aggressive => Mood::Enraged,
        };
        self.targets.insert(attacker, TargetWeight::Enemy);

        if !weapon.has_trait(ItemTraits::WEAPON) {
            return AttackOutcome::Ineffective;
        }
        let damage = weapon.spec().damage;
        self.health -= damage;
        if self.health <= 0 {
            let drops = self
                .spec()
                .drops
                .iter()
                .map(|&(kind, quantity)| ItemStack::new(kind, quantity))
                .collect();
            return AttackOutcome::Killed { damage, drops };
        }
        AttackOutcome::Hit { damage }
    }

    /// Glyph plus a mood marker.
    pub fn glyph(&self) -> String {
        let marker = match self.mood {
            Mood::Terrorized | Mood::Enraged => '!',
            Mood::Asleep => 'z',
            _ => ' ',
        };
        format!("{}{marker}", self.spec().glyph)
    }
}
