//! Render queries.
//!
//! The engine does not draw anything. It hands the presentation layer raw
//! semantic values per cell: a two-column glyph, foreground and background
//! colours already dimmed by distance, and a visibility [`Tier`]. These are
//! pure functions over world data so they can be tested headlessly.

use std::fmt;

use serde::{Deserialize, Serialize};
use taiga_grid::coord::Coord;
use taiga_grid::tile::Biome;

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// An sRGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Player glyph colour: #FDC300.
pub const PLAYER_COLOR: Rgb = Rgb::new(0xFD, 0xC3, 0x00);

/// Remembered cells fade toward this: #444444.
pub const MEMORY_COLOR: Rgb = Rgb::new(0x44, 0x44, 0x44);

pub const BLACK: Rgb = Rgb::new(0, 0, 0);

/// Used when a catalog colour fails to parse: #FDFFCC.
pub const FALLBACK_COLOR: Rgb = Rgb::new(0xFD, 0xFF, 0xCC);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Catalog colours are static; a malformed one renders as the fallback.
    pub fn from_catalog(hex: &str) -> Self {
        Self::from_hex(hex).unwrap_or(FALLBACK_COLOR)
    }

    /// Linear blend toward `other`; `t` is clamped to `0.0..=1.0`.
    pub fn blend(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            v.round() as u8
        };
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Foreground fades toward the memory colour with distance.
pub fn foreground(base: Rgb, distance: f64) -> Rgb {
    base.blend(MEMORY_COLOR, distance)
}

/// Background darkens toward black, never brighter than 80%.
pub fn background(base: Rgb, distance: f64) -> Rgb {
    base.blend(BLACK, (0.2 + distance).min(1.0))
}

// ---------------------------------------------------------------------------
// Appearance
// ---------------------------------------------------------------------------

/// What a cell looks like: glyph plus base colour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    pub glyph: String,
    pub color: Rgb,
}

impl Appearance {
    pub fn new(glyph: impl Into<String>, color: Rgb) -> Self {
        Self {
            glyph: glyph.into(),
            color,
        }
    }
}

/// Texture variant in `0..10`, stable per coordinate.
fn variant(c: Coord) -> usize {
    let h = (c.x as u32).wrapping_mul(0x9E37_79B1) ^ (c.y as u32).wrapping_mul(0x85EB_CA77);
    (h >> 16) as usize % 10
}

fn pick(glyphs: &[&'static str], c: Coord) -> &'static str {
    glyphs[variant(c) % glyphs.len()]
}

/// Ground appearance of `biome` at `c`.
pub fn biome_appearance(biome: Biome, c: Coord) -> Appearance {
    match biome {
        Biome::Ocean | Biome::River => {
            let shimmer = variant(c) as f64 / 10.0;
            let color = Rgb::new(0x46, 0x46, 0x8C).blend(Rgb::new(0x50, 0x4E, 0xA6), shimmer);
            Appearance::new("≈≈", color)
        }
        Biome::Bog => Appearance::new(pick(&[",'", "',"], c), Rgb::new(0x3F, 0x32, 0x22)),
        Biome::BirchForest | Biome::Boreal => {
            Appearance::new(pick(&["''", "\"'"], c), Rgb::new(0x2B, 0x8C, 0x28))
        }
        Biome::Rocky => Appearance::new("፨፨", Rgb::new(0x9D, 0xAA, 0xB0)),
        Biome::Mountainous | Biome::Glacial => {
            Appearance::new(pick(&["^^", "^.", ".^"], c), Rgb::new(0x9D, 0xAA, 0xB0))
        }
    }
}

// ---------------------------------------------------------------------------
// Rendered map
// ---------------------------------------------------------------------------

/// How a cell is known to the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tier {
    /// In sight, at this normalized distance.
    Visible { distance: f64 },
    /// Seen before; shows the remembered appearance.
    Remembered,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedCell {
    pub coord: Coord,
    pub glyph: String,
    pub fg: Rgb,
    pub bg: Rgb,
    pub tier: Tier,
}

impl RenderedCell {
    pub(crate) fn unknown(coord: Coord) -> Self {
        Self {
            coord,
            glyph: "  ".to_owned(),
            fg: BLACK,
            bg: BLACK,
            tier: Tier::Unknown,
        }
    }

    pub(crate) fn remembered(coord: Coord, memory: &Appearance) -> Self {
        Self {
            coord,
            glyph: memory.glyph.clone(),
            fg: MEMORY_COLOR,
            bg: BLACK,
            tier: Tier::Remembered,
        }
    }
}

/// A viewport, row-major, centred on the viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedMap {
    /// Cells per row.
    pub width: usize,
    pub height: usize,
    pub rows: Vec<Vec<RenderedCell>>,
}

impl RenderedMap {
    /// Glyphs only, one line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * (self.width * 2 + 1));
        for row in &self.rows {
            for cell in row {
                out.push_str(&cell.glyph);
            }
            out.push('\n');
        }
        out
    }

    pub fn cell(&self, c: Coord) -> Option<&RenderedCell> {
        self.rows.iter().flatten().find(|cell| cell.coord == c)
    }
}

// ---------------------------------------------------------------------------
// Sidebar helpers
// ---------------------------------------------------------------------------

fn arrow(dx: i32, dy: i32) -> Option<&'static str> {
    Some(match (dx, dy) {
        (-1, -1) => "↖",
        (0, -1) => "↑",
        (1, -1) => "↗",
        (-1, 0) => "←",
        (1, 0) => "→",
        (-1, 1) => "↙",
        (0, 1) => "↓",
        (1, 1) => "↘",
        _ => return None,
    })
}

/// `"↗ 12"`: direction from `from` toward `to` and the Manhattan distance.
/// Same-cell targets get the distance only.
pub fn compass_indicator(from: Coord, to: Coord) -> String {
    let dx = (to.x - from.x).clamp(-1, 1);
    let dy = (to.y - from.y).clamp(-1, 1);
    let distance = from.manhattan(to);
    match arrow(dx, dy) {
        Some(a) => format!("{a} {distance}"),
        None => distance.to_string(),
    }
}

const SEASONS: [&str; 4] = ["spring", "summer", "fall", "winter"];

/// `"summer : Year 2, Day 120"` for a world `days` old.
pub fn world_status(days: f64) -> String {
    let whole = days.max(0.0).floor() as u64;
    let day = whole % 365;
    let year = whole / 365;
    let season = SEASONS[((day as f64 / 91.25) as usize).min(SEASONS.len() - 1)];
    format!("{season} : Year {year}, Day {day}")
}

/// A text progress bar `[####      ]` of `width` cells.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}
