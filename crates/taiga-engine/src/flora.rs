//! Flora species and their harvest state.
//!
//! A species lists its products. Each product is keyed by the tool trait it
//! needs ([`ItemTraits::NONE`] means any tool). Harvesting looks up the first
//! product the wielded item qualifies for, adds the item's `power` to that
//! product's progress, and once progress reaches 1.0 yields the product's
//! items and marks it exhausted. A product marked `depletes` kills the plant.
//!
//! Harvest state belongs to the individual plant, so two pines of the same
//! species track their progress independently.

use serde::{Deserialize, Serialize};

use crate::item::ItemKind::{self, *};
use crate::item::{ItemStack, ItemTraits};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One harvestable output of a species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Product {
    /// Trait the wielded item must have.
    pub with: ItemTraits,
    /// Harvesting this product removes the plant.
    pub depletes: bool,
    pub yields: &'static [(ItemKind, u32)],
}

/// Static properties of a species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloraSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub glyph: &'static str,
    pub color: &'static str,
    /// Shrubs can be walked through and seen through; trees cannot.
    pub walkable: bool,
    pub products: &'static [Product],
}

const fn tree(
    id: &'static str,
    name: &'static str,
    glyph: &'static str,
    color: &'static str,
    products: &'static [Product],
) -> FloraSpec {
    FloraSpec {
        id,
        name,
        glyph,
        color,
        walkable: false,
        products,
    }
}

const fn shrub(
    id: &'static str,
    name: &'static str,
    glyph: &'static str,
    color: &'static str,
    products: &'static [Product],
) -> FloraSpec {
    FloraSpec {
        walkable: true,
        ..tree(id, name, glyph, color, products)
    }
}

const fn felled(yields: &'static [(ItemKind, u32)]) -> Product {
    Product {
        with: ItemTraits::AXE,
        depletes: true,
        yields,
    }
}

const fn cut(yields: &'static [(ItemKind, u32)]) -> Product {
    Product {
        with: ItemTraits::KNIFE,
        depletes: false,
        yields,
    }
}

const fn picked(yields: &'static [(ItemKind, u32)]) -> Product {
    Product {
        with: ItemTraits::NONE,
        depletes: false,
        yields,
    }
}

const SCOTS_PINE: &[Product] = &[felled(&[(PineWood, 4)]), cut(&[(PineBark, 4)])];
const NORWAY_SPRUCE: &[Product] = &[felled(&[(SpruceWood, 4)]), cut(&[(SpruceShoots, 1)])];
const ASPEN: &[Product] = &[felled(&[(AspenWood, 4)]), cut(&[(AspenBark, 4)])];
const GREY_ALDER: &[Product] = &[felled(&[(GreyAlderWood, 4)]), cut(&[(GreyAlderBark, 2)])];
const BIRD_CHERRY: &[Product] = &[felled(&[(BirdCherryWood, 4)]), picked(&[(BirdCherries, 4)])];
const DOWNY_BIRCH: &[Product] = &[
    felled(&[(DownyBirchWood, 4), (DownyBirchBranches, 4)]),
    cut(&[(DownyBirchBark, 4), (DownyBirchBranches, 2)]),
];
const BOG_MYRTLE: &[Product] = &[picked(&[(BogMyrtleLeaves, 4)])];
const GOAT_WILLOW: &[Product] = &[cut(&[(GoatWillowStalks, 2)])];
const GLAUCOUS_WILLOW: &[Product] = &[picked(&[(GlaucousWillowCatkins, 2)])];
const CLOUDBERRY_BUSH: &[Product] = &[picked(&[(Cloudberries, 10)])];

/// Every plant species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloraSpecies {
    ScotsPine,
    NorwaySpruce,
    Aspen,
    GreyAlder,
    BirdCherry,
    DownyBirch,
    BogMyrtle,
    GoatWillow,
    GlaucousWillow,
    CloudberryBush,
}

impl FloraSpecies {
    pub const ALL: [FloraSpecies; 10] = [
        FloraSpecies::ScotsPine,
        FloraSpecies::NorwaySpruce,
        FloraSpecies::Aspen,
        FloraSpecies::GreyAlder,
        FloraSpecies::BirdCherry,
        FloraSpecies::DownyBirch,
        FloraSpecies::BogMyrtle,
        FloraSpecies::GoatWillow,
        FloraSpecies::GlaucousWillow,
        FloraSpecies::CloudberryBush,
    ];

    pub const fn spec(self) -> FloraSpec {
        match self {
            FloraSpecies::ScotsPine => tree("scots-pine", "Scots Pine", "P ", "#3F3C18", SCOTS_PINE),
            FloraSpecies::NorwaySpruce => {
                tree("norway-spruce", "Norway Spruce", "A ", "#424118", NORWAY_SPRUCE)
            }
            FloraSpecies::Aspen => tree("aspen", "Aspen", "AA", "#388164", ASPEN),
            FloraSpecies::GreyAlder => tree("grey-alder", "Grey Alder", "A ", "#78A14D", GREY_ALDER),
            FloraSpecies::BirdCherry => {
                tree("bird-cherry", "Bird Cherry", "A ", "#3C840B", BIRD_CHERRY)
            }
            FloraSpecies::DownyBirch => {
                tree("downy-birch", "Downy Birch", "A ", "#876E3A", DOWNY_BIRCH)
            }
            FloraSpecies::BogMyrtle => shrub("bog-myrtle", "Bog Myrtle", "m ", "#6C8568", BOG_MYRTLE),
            FloraSpecies::GoatWillow => {
                shrub("goat-willow", "Goat Willow", "w ", "#B7C052", GOAT_WILLOW)
            }
            FloraSpecies::GlaucousWillow => shrub(
                "glaucous-willow",
                "Glaucous Willow",
                "W ",
                "#233812",
                GLAUCOUS_WILLOW,
            ),
            FloraSpecies::CloudberryBush => shrub(
                "cloudberry-bush",
                "Cloudberry Bush",
                "w ",
                "#C34105",
                CLOUDBERRY_BUSH,
            ),
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

// ---------------------------------------------------------------------------
// Flora
// ---------------------------------------------------------------------------

/// What one harvest attempt did.
#[derive(Clone, Debug, PartialEq)]
pub struct HarvestOutcome {
    /// The plant is gone and must be removed from the world.
    pub depleted: bool,
    /// The attempt made progress (or finished a product).
    pub success: bool,
    /// Progress of the product worked on, `0.0..=1.0`.
    pub progress: f64,
    pub yields: Vec<ItemStack>,
}

impl HarvestOutcome {
    fn failed() -> Self {
        Self {
            depleted: false,
            success: false,
            progress: 0.0,
            yields: Vec::new(),
        }
    }
}

/// Progress of one product.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
enum ProductState {
    Growing(f64),
    Exhausted,
}

/// A living plant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flora {
    species: FloraSpecies,
    products: Vec<ProductState>,
}

impl Flora {
    pub fn new(species: FloraSpecies) -> Self {
        Self {
            species,
            products: vec![ProductState::Growing(0.0); species.spec().products.len()],
        }
    }

    pub fn species(&self) -> FloraSpecies {
        self.species
    }

    pub fn spec(&self) -> FloraSpec {
        self.species.spec()
    }

    pub fn walkable(&self) -> bool {
        self.spec().walkable
    }

    /// Plants block sight exactly when they block movement.
    pub fn see_through(&self) -> bool {
        self.walkable()
    }

    /// Work the plant with `tool`.
    ///
    /// Only the first product the tool qualifies for is considered; if that
    /// product is already exhausted the attempt fails even when a later
    /// product would accept the tool.
    pub fn harvest(&mut self, tool: ItemKind) -> HarvestOutcome {
        let spec = self.spec();
        let Some(index) = spec.products.iter().position(|p| tool.has_trait(p.with)) else {
            return HarvestOutcome::failed();
        };
        let product = spec.products[index];
        let Some(state) = self.products.get_mut(index) else {
            return HarvestOutcome::failed();
        };
        let progress = match *state {
            ProductState::Exhausted => return HarvestOutcome::failed(),
            ProductState::Growing(p) => p + tool.spec().power,
        };
        if progress < 1.0 {
            *state = ProductState::Growing(progress);
            return HarvestOutcome {
                depleted: false,
                success: true,
                progress,
                yields: Vec::new(),
            };
        }
        *state = ProductState::Exhausted;
        HarvestOutcome {
            depleted: product.depletes,
            success: true,
            progress: 1.0,
            yields: product
                .yields
                .iter()
                .map(|&(kind, quantity)| ItemStack::new(kind, quantity))
                .collect(),
        }
    }
}
