//! World seeds.
//!
//! Terrain generation happens outside the engine. What crosses the boundary
//! is a [`WorldSeed`]: one biome per cell of an N×N grid plus initial flora,
//! NPC and item placements. [`WorldState::from_seed`](crate::state::WorldState::from_seed)
//! turns it into arena entries and packed tiles.
//!
//! The helpers here cover callers that start from less: a heightmap becomes
//! biomes with [`biomes_from_heights`], and [`WorldSeed::scatter`] fills in
//! the usual biome-driven vegetation and wildlife.

use noise::{NoiseFn, Simplex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use taiga_grid::coord::Coord;
use taiga_grid::tile::Biome;

use crate::flora::FloraSpecies;
use crate::item::{ItemKind, ItemStack};
use crate::npc::NpcSpecies;

/// Upper elevation bound (exclusive) of each land biome. Anything at or above
/// the last bound is glacial; anything below zero is ocean.
const ELEVATION_BANDS: [(f64, Biome); 6] = [
    (0.0, Biome::Ocean),
    (0.05, Biome::Bog),
    (0.2, Biome::BirchForest),
    (0.4, Biome::Boreal),
    (0.6, Biome::Rocky),
    (0.8, Biome::Mountainous),
];

/// Everything a world starts with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSeed {
    /// Side length N.
    pub size: i32,
    /// Row-major, `size * size` entries.
    pub biomes: Vec<Biome>,
    pub flora: Vec<(Coord, FloraSpecies)>,
    pub npcs: Vec<(Coord, NpcSpecies)>,
    pub items: Vec<(Coord, ItemStack)>,
}

impl WorldSeed {
    /// A bare world of one biome.
    pub fn uniform(size: i32, biome: Biome) -> Self {
        let cells = (size.max(0) as usize).pow(2);
        Self {
            size,
            biomes: vec![biome; cells],
            flora: Vec::new(),
            npcs: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Populate `biomes` with one independent roll per cell.
    ///
    /// Each cell draws `r` in `0..1000`. Bogs grow myrtle; birch forests a
    /// mix of broadleaf trees with the odd rabbit; boreal forest pine, spruce,
    /// cloudberries and rarely a bear; rocky ground conifers and sharp rocks;
    /// mountains a few pines. Water and ice stay bare.
    pub fn scatter<R: Rng + ?Sized>(size: i32, biomes: Vec<Biome>, rng: &mut R) -> Self {
        let mut seed = Self {
            size,
            biomes,
            flora: Vec::new(),
            npcs: Vec::new(),
            items: Vec::new(),
        };
        let width = size.max(1);
        for (i, &biome) in seed.biomes.iter().enumerate() {
            let c = Coord::new(i as i32 % width, i as i32 / width);
            let r: u32 = rng.gen_range(0..1000);
            if let Some(species) = flora_roll(biome, r) {
                seed.flora.push((c, species));
            }
            match (biome, r) {
                (Biome::BirchForest, 200..=203) => seed.npcs.push((c, NpcSpecies::Rabbit)),
                (Biome::Boreal, 130..=131) => seed.npcs.push((c, NpcSpecies::BrownBear)),
                (Biome::Rocky, 120..=125) => seed.items.push((c, ItemStack::new(ItemKind::SharpRock, 1))),
                _ => {}
            }
        }
        seed
    }
}

fn flora_roll(biome: Biome, r: u32) -> Option<FloraSpecies> {
    use FloraSpecies::*;
    Some(match (biome, r) {
        (Biome::Bog, 0..=49) => BogMyrtle,

        (Biome::BirchForest, 0..=99) => DownyBirch,
        (Biome::BirchForest, 100..=119) => Aspen,
        (Biome::BirchForest, 120..=139) => ScotsPine,
        (Biome::BirchForest, 140..=159) => GreyAlder,
        (Biome::BirchForest, 160..=179) => GoatWillow,
        (Biome::BirchForest, 180..=199) => BirdCherry,

        (Biome::Boreal, 0..=59) => ScotsPine,
        (Biome::Boreal, 60..=119) => NorwaySpruce,
        (Biome::Boreal, 120..=129) => CloudberryBush,

        (Biome::Rocky, 0..=59) => ScotsPine,
        (Biome::Rocky, 60..=119) => NorwaySpruce,

        (Biome::Mountainous, 0..=19) => ScotsPine,
        _ => return None,
    })
}

/// Classify one elevation. Roughly 1.0 is a thousand metres.
pub fn biome_for_height(z: f64) -> Biome {
    ELEVATION_BANDS
        .iter()
        .find(|&&(bound, _)| z < bound)
        .map_or(Biome::Glacial, |&(_, biome)| biome)
}

pub fn biomes_from_heights(heights: &[f64]) -> Vec<Biome> {
    heights.iter().map(|&z| biome_for_height(z)).collect()
}

/// Relative weight of the simplex octaves on top of the radial falloff.
const RELIEF: f64 = 0.2;

/// A radial island roughened by three octaves of simplex noise, normalized
/// so the highest point is 1.0. Negative (sea) values are left as they are.
///
/// The noise is sampled in world-relative coordinates, so neighbouring cells
/// stay close in height and biomes form contiguous regions at any size.
pub fn island_heights<R: Rng + ?Sized>(size: i32, rng: &mut R) -> Vec<f64> {
    let n = size.max(0);
    let elevation = Simplex::new(rng.gen());
    let centre = f64::from(n) / 2.0;
    let scale = f64::from(n.max(1));
    let mut raw = Vec::with_capacity((n as usize).pow(2));
    for y in 0..n {
        for x in 0..n {
            let dx = (f64::from(x) - centre) / centre.max(1.0);
            let dy = (f64::from(y) - centre) / centre.max(1.0);
            let falloff = 1.0 - (dx * dx + dy * dy).sqrt() * 1.2;

            let (nx, ny) = (f64::from(x) / scale, f64::from(y) / scale);
            let relief = (elevation.get([nx * 3.0, ny * 3.0])
                + 0.5 * elevation.get([nx * 6.0, ny * 6.0])
                + 0.25 * elevation.get([nx * 12.0, ny * 12.0]))
                / 1.75;
            raw.push(falloff + RELIEF * relief);
        }
    }
    let max = raw.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for h in raw.iter_mut().filter(|h| **h > 0.0) {
            *h /= max;
        }
    }
    raw
}
