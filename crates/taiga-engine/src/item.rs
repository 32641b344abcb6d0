//! Item catalog and inventory stacks.
//!
//! Items are a closed catalog ([`ItemKind`]). Each kind has static properties
//! ([`ItemSpec`]): display glyph and colour, weight, trait bits, tool power
//! and weapon damage. Stacks of one kind ([`ItemStack`]) are what the item
//! arena stores and what inventories hold.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemTraits
// ---------------------------------------------------------------------------

/// Bit set of tool and food properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemTraits(u8);

impl ItemTraits {
    /// No traits. Every item "has" the empty set, so a product keyed on it
    /// can be harvested with anything, bare hands included.
    pub const NONE: Self = Self(0);
    pub const AXE: Self = Self(1 << 0);
    pub const KNIFE: Self = Self(1 << 1);
    pub const WEAPON: Self = Self(1 << 2);
    pub const EDIBLE: Self = Self(1 << 3);

    /// True if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ItemTraits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// ItemSpec
// ---------------------------------------------------------------------------

/// Static properties of an item kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemSpec {
    /// Stable identifier.
    pub id: &'static str,
    pub name: &'static str,
    /// Two-column glyph.
    pub glyph: &'static str,
    /// Foreground colour as `#RRGGBB`.
    pub color: &'static str,
    pub weight: f64,
    pub traits: ItemTraits,
    /// Harvest progress added per use.
    pub power: f64,
    /// Damage dealt when used as a weapon.
    pub damage: i32,
    /// Hunger removed when eaten.
    pub nutrition: f64,
}

const fn material(
    id: &'static str,
    name: &'static str,
    glyph: &'static str,
    color: &'static str,
    weight: f64,
) -> ItemSpec {
    ItemSpec {
        id,
        name,
        glyph,
        color,
        weight,
        traits: ItemTraits::NONE,
        power: 0.0,
        damage: 0,
        nutrition: 0.0,
    }
}

const fn food(
    id: &'static str,
    name: &'static str,
    glyph: &'static str,
    color: &'static str,
    weight: f64,
    nutrition: f64,
) -> ItemSpec {
    ItemSpec {
        traits: ItemTraits::EDIBLE,
        nutrition,
        ..material(id, name, glyph, color, weight)
    }
}

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// Every item that can exist in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// The wielded "item" of an empty hand. Never stored in an inventory.
    BareHands,
    SharpRock,
    StoneAxe,
    PineWood,
    PineBark,
    SpruceWood,
    SpruceShoots,
    AspenWood,
    AspenBark,
    GreyAlderWood,
    GreyAlderBark,
    BirdCherryWood,
    BirdCherries,
    DownyBirchWood,
    DownyBirchBark,
    DownyBirchBranches,
    BogMyrtleLeaves,
    GoatWillowStalks,
    GlaucousWillowCatkins,
    Cloudberries,
    Cordage,
    BerryMash,
    RawMeat,
    RabbitPelt,
    BearPelt,
}

impl ItemKind {
    pub const ALL: [ItemKind; 25] = [
        ItemKind::BareHands,
        ItemKind::SharpRock,
        ItemKind::StoneAxe,
        ItemKind::PineWood,
        ItemKind::PineBark,
        ItemKind::SpruceWood,
        ItemKind::SpruceShoots,
        ItemKind::AspenWood,
        ItemKind::AspenBark,
        ItemKind::GreyAlderWood,
        ItemKind::GreyAlderBark,
        ItemKind::BirdCherryWood,
        ItemKind::BirdCherries,
        ItemKind::DownyBirchWood,
        ItemKind::DownyBirchBark,
        ItemKind::DownyBirchBranches,
        ItemKind::BogMyrtleLeaves,
        ItemKind::GoatWillowStalks,
        ItemKind::GlaucousWillowCatkins,
        ItemKind::Cloudberries,
        ItemKind::Cordage,
        ItemKind::BerryMash,
        ItemKind::RawMeat,
        ItemKind::RabbitPelt,
        ItemKind::BearPelt,
    ];

    pub const fn spec(self) -> ItemSpec {
        match self {
            ItemKind::BareHands => ItemSpec {
                power: 0.25,
                ..material("bare-hands", "Bare Hands", "  ", "#FDC300", 0.0)
            },
            ItemKind::SharpRock => ItemSpec {
                traits: ItemTraits(ItemTraits::KNIFE.0 | ItemTraits::WEAPON.0),
                power: 0.5,
                damage: 5,
                ..material("sharp-rock", "Sharp Rock", "◆ ", "#9DAAB0", 0.5)
            },
            ItemKind::StoneAxe => ItemSpec {
                traits: ItemTraits(ItemTraits::AXE.0 | ItemTraits::WEAPON.0),
                power: 1.0,
                damage: 10,
                ..material("stone-axe", "Stone Axe", "/ ", "#B0A69D", 2.0)
            },
            ItemKind::PineWood => material("pine-wood", "Pine Wood", "==", "#EE852D", 0.75),
            ItemKind::PineBark => material("pine-bark", "Pine Bark", "~ ", "#372F22", 0.1),
            ItemKind::SpruceWood => material("spruce-wood", "Spruce Wood", "==", "#C0A18C", 0.75),
            ItemKind::SpruceShoots => {
                food("spruce-shoots", "Spruce Shoots", "u ", "#5B7B1A", 0.01, 0.01)
            }
            ItemKind::AspenWood => material("aspen-wood", "Aspen Wood", "==", "#E9D6AC", 0.75),
            ItemKind::AspenBark => material("aspen-bark", "Aspen Bark", "~ ", "#848582", 0.1),
            ItemKind::GreyAlderWood => {
                material("grey-alder-wood", "Grey Alder Wood", "==", "#AB8458", 0.75)
            }
            ItemKind::GreyAlderBark => {
                material("grey-alder-bark", "Grey Alder Bark", "~ ", "#BF8C77", 0.1)
            }
            ItemKind::BirdCherryWood => {
                material("bird-cherry-wood", "Bird Cherry Wood", "==", "#A77235", 0.75)
            }
            ItemKind::BirdCherries => {
                food("bird-cherries", "Bird Cherries", ": ", "#0C1A1B", 0.05, 0.03)
            }
            ItemKind::DownyBirchWood => {
                material("downy-birch-wood", "Downy Birch Wood", "==", "#BB926B", 0.75)
            }
            ItemKind::DownyBirchBark => {
                material("downy-birch-bark", "Downy Birch Bark", "~ ", "#8C827E", 0.1)
            }
            ItemKind::DownyBirchBranches => material(
                "downy-birch-branches",
                "Downy Birch Branches",
                "~~",
                "#676153",
                0.25,
            ),
            ItemKind::BogMyrtleLeaves => {
                material("bog-myrtle-leaves", "Bog Myrtle Leaves", "..", "#778872", 0.01)
            }
            ItemKind::GoatWillowStalks => {
                material("goat-willow-stalks", "Goat Willow Stalks", "..", "#4D5824", 0.05)
            }
            ItemKind::GlaucousWillowCatkins => material(
                "glaucous-willow-catkins",
                "Glaucous Willow Catkins",
                ",,",
                "#CFBDA8",
                0.01,
            ),
            ItemKind::Cloudberries => {
                food("cloudberries", "Cloudberries", ". ", "#FAB3BD", 0.01, 0.05)
            }
            ItemKind::Cordage => material("cordage", "Cordage", "§ ", "#8A7A4E", 0.1),
            ItemKind::BerryMash => food("berry-mash", "Berry Mash", "o ", "#C34105", 0.2, 0.3),
            ItemKind::RawMeat => food("raw-meat", "Raw Meat", "% ", "#B5413B", 0.5, 0.2),
            ItemKind::RabbitPelt => material("rabbit-pelt", "Rabbit Pelt", "& ", "#D9CBB0", 0.2),
            ItemKind::BearPelt => material("bear-pelt", "Bear Pelt", "&&", "#6B4A2B", 4.0),
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    #[inline]
    pub fn weight(self) -> f64 {
        self.spec().weight
    }

    #[inline]
    pub fn traits(self) -> ItemTraits {
        self.spec().traits
    }

    #[inline]
    pub fn has_trait(self, t: ItemTraits) -> bool {
        self.traits().contains(t)
    }

    /// Tools and weapons are wielded when activated; food is eaten.
    pub fn is_tool(self) -> bool {
        let t = self.traits();
        t.contains(ItemTraits::AXE) || t.contains(ItemTraits::KNIFE) || t.contains(ItemTraits::WEAPON)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ItemStack
// ---------------------------------------------------------------------------

/// Some quantity of one item kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(kind: ItemKind, quantity: u32) -> Self {
        Self { kind, quantity }
    }

    pub fn weight(&self) -> f64 {
        f64::from(self.quantity) * self.kind.weight()
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.quantity, self.kind.name())
    }
}
