//! The per-cell record and its fixed 6-byte encoding.
//!
//! Byte layout of a [`PackedTile`]:
//!
//! | byte | bits | field                         |
//! |------|------|-------------------------------|
//! | 0    | 0-3  | player slot (0-15)            |
//! | 0    | 4-7  | biome tag (0-15)              |
//! | 1    | 0-7  | NPC slot (0-255)              |
//! | 2-3  | LE   | item slot (0-65535)           |
//! | 4-5  | LE   | flora slot (0-65535)          |
//!
//! A zero slot means "nothing of that kind here". Every non-zero slot must
//! resolve to a live arena entry; keeping that true is the world's job, the
//! tile only guarantees that a slot fits its field.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arena::Handle;
use crate::GridError;

/// Bytes per encoded tile.
pub const TILE_BYTES: usize = 6;

/// One encoded cell.
pub type PackedTile = [u8; TILE_BYTES];

// ---------------------------------------------------------------------------
// Biome
// ---------------------------------------------------------------------------

/// Terrain class of a cell. At most 16 variants fit the packed nibble.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Biome {
    #[default]
    Ocean = 0,
    River = 1,
    Bog = 2,
    BirchForest = 3,
    Boreal = 4,
    Rocky = 5,
    Mountainous = 6,
    Glacial = 7,
}

impl Biome {
    pub const ALL: [Biome; 8] = [
        Biome::Ocean,
        Biome::River,
        Biome::Bog,
        Biome::BirchForest,
        Biome::Boreal,
        Biome::Rocky,
        Biome::Mountainous,
        Biome::Glacial,
    ];

    /// Decode a biome nibble. Unassigned values have no biome.
    pub fn from_nibble(n: u8) -> Option<Biome> {
        Self::ALL.get(n as usize).copied()
    }

    #[inline]
    pub fn nibble(self) -> u8 {
        self as u8
    }

    /// Open water cannot be walked on.
    pub fn is_water(self) -> bool {
        matches!(self, Biome::Ocean | Biome::River)
    }

    pub fn name(self) -> &'static str {
        match self {
            Biome::Ocean => "ocean",
            Biome::River => "river",
            Biome::Bog => "bog",
            Biome::BirchForest => "birch forest",
            Biome::Boreal => "boreal forest",
            Biome::Rocky => "rocky ground",
            Biome::Mountainous => "mountains",
            Biome::Glacial => "glacier",
        }
    }
}

// ---------------------------------------------------------------------------
// SlotKind
// ---------------------------------------------------------------------------

/// Which arena a tile slot indexes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    Player,
    Npc,
    Item,
    Flora,
}

impl SlotKind {
    /// Every kind, in occupant precedence order.
    pub const ALL: [SlotKind; 4] = [
        SlotKind::Player,
        SlotKind::Npc,
        SlotKind::Item,
        SlotKind::Flora,
    ];

    /// Largest handle the packed field can hold.
    pub const fn max_handle(self) -> u32 {
        match self {
            SlotKind::Player => 0x0F,
            SlotKind::Npc => 0xFF,
            SlotKind::Item | SlotKind::Flora => 0xFFFF,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotKind::Player => "player",
            SlotKind::Npc => "npc",
            SlotKind::Item => "item",
            SlotKind::Flora => "flora",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// Decoded cell state: four arena slots and a biome tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    player: u8,
    biome: Biome,
    npc: u8,
    item: u16,
    flora: u16,
}

impl Tile {
    /// An empty cell of the given biome.
    pub fn new(biome: Biome) -> Self {
        Self {
            biome,
            ..Self::default()
        }
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    pub fn set_biome(&mut self, biome: Biome) {
        self.biome = biome;
    }

    /// The handle stored in the `kind` field, if any.
    pub fn slot(&self, kind: SlotKind) -> Option<Handle> {
        let raw = match kind {
            SlotKind::Player => u32::from(self.player),
            SlotKind::Npc => u32::from(self.npc),
            SlotKind::Item => u32::from(self.item),
            SlotKind::Flora => u32::from(self.flora),
        };
        Handle::from_raw(raw)
    }

    /// Store (or clear, with `None`) the `kind` field.
    ///
    /// Fails with [`GridError::HandleOutOfRange`] if the handle does not fit
    /// the packed field width; the tile is left unchanged.
    pub fn set_slot(&mut self, kind: SlotKind, handle: Option<Handle>) -> Result<(), GridError> {
        let raw = handle.map_or(0, Handle::raw);
        if raw > kind.max_handle() {
            return Err(GridError::HandleOutOfRange {
                kind,
                handle: raw,
                max: kind.max_handle(),
            });
        }
        match kind {
            SlotKind::Player => self.player = raw as u8,
            SlotKind::Npc => self.npc = raw as u8,
            SlotKind::Item => self.item = raw as u16,
            SlotKind::Flora => self.flora = raw as u16,
        }
        Ok(())
    }

    /// Builder form of [`set_slot`](Self::set_slot).
    pub fn with_slot(mut self, kind: SlotKind, handle: Option<Handle>) -> Result<Self, GridError> {
        self.set_slot(kind, handle)?;
        Ok(self)
    }

    /// True when no slot is occupied.
    pub fn is_vacant(&self) -> bool {
        self.player == 0 && self.npc == 0 && self.item == 0 && self.flora == 0
    }

    /// Encode into the fixed byte layout.
    pub fn encode(&self) -> PackedTile {
        let item = self.item.to_le_bytes();
        let flora = self.flora.to_le_bytes();
        [
            (self.player & 0x0F) | (self.biome.nibble() << 4),
            self.npc,
            item[0],
            item[1],
            flora[0],
            flora[1],
        ]
    }

    /// Decode the fixed byte layout. An unassigned biome nibble decodes as
    /// the default biome.
    pub fn decode(bytes: &PackedTile) -> Self {
        Self {
            player: bytes[0] & 0x0F,
            biome: Biome::from_nibble(bytes[0] >> 4).unwrap_or_default(),
            npc: bytes[1],
            item: u16::from_le_bytes([bytes[2], bytes[3]]),
            flora: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
