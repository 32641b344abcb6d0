//! Taiga Grid -- packed tile storage and entity slot tables.
//!
//! This crate is the storage layer of the Taiga world engine. It knows
//! nothing about players or creatures; it provides:
//!
//! - [`Coord`](coord::Coord) and [`Rect`](coord::Rect) arithmetic.
//! - [`Arena`](arena::Arena): a capacity-bounded slot table handing out
//!   small integer [`Handle`](arena::Handle)s with LIFO tombstone reuse.
//! - [`Tile`](tile::Tile): one cell's four arena slots plus a biome tag, with
//!   a fixed six-byte encoding.
//! - [`Grid`](grid::Grid): the flat array of encoded tiles.
//!
//! # Quick Start
//!
//! ```
//! use taiga_grid::prelude::*;
//!
//! let mut npcs: Arena<&str> = Arena::with_capacity(255);
//! let mut grid = Grid::new(16, 16);
//!
//! let rabbit = npcs.append("rabbit").unwrap();
//! let at = Coord::new(3, 4);
//! let tile = grid.at(at).unwrap().with_slot(SlotKind::Npc, Some(rabbit)).unwrap();
//! grid.write(at, tile);
//!
//! let found = grid.at(at).and_then(|t| t.slot(SlotKind::Npc));
//! assert_eq!(found.and_then(|h| npcs.get(h)), Some(&"rabbit"));
//! ```

#![deny(unsafe_code)]

pub mod arena;
pub mod coord;
pub mod grid;
pub mod tile;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by grid and arena operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The arena is at capacity and has no tombstoned slot to reuse.
    #[error("arena at capacity ({capacity}) with no free slot")]
    CapacityExhausted { capacity: u32 },

    /// A handle is wider than the packed tile field it was written to.
    #[error("{kind} handle {handle} does not fit the packed tile field (max {max})")]
    HandleOutOfRange {
        kind: tile::SlotKind,
        handle: u32,
        max: u32,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::arena::{Arena, Handle};
    pub use crate::coord::{Coord, Rect};
    pub use crate::grid::Grid;
    pub use crate::tile::{Biome, PackedTile, SlotKind, Tile, TILE_BYTES};
    pub use crate::GridError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn grid_and_arena_stay_in_step_through_reuse() {
        let mut items: Arena<u32> = Arena::with_capacity(2);
        let mut grid = Grid::new(4, 4);

        let a = items.append(10).unwrap();
        let b = items.append(20).unwrap();
        for (h, c) in [(a, Coord::new(0, 0)), (b, Coord::new(1, 0))] {
            let t = grid.at(c).unwrap().with_slot(SlotKind::Item, Some(h)).unwrap();
            grid.write(c, t);
        }
        assert!(items.append(30).is_err());

        // Remove `a`: clear the tile and tombstone the slot together.
        let c = Coord::new(0, 0);
        let t = grid.at(c).unwrap().with_slot(SlotKind::Item, None).unwrap();
        grid.write(c, t);
        items.remove(a);

        let reused = items.append(40).unwrap();
        assert_eq!(reused, a);
        let c2 = Coord::new(3, 3);
        let t = grid.at(c2).unwrap().with_slot(SlotKind::Item, Some(reused)).unwrap();
        grid.write(c2, t);

        for (c, tile) in grid.within(Rect::from_corners(Coord::new(0, 0), Coord::new(3, 3))) {
            if let Some(h) = tile.slot(SlotKind::Item) {
                assert!(items.contains(h), "tile at {c} points at a dead slot");
            }
        }
        assert_eq!(grid.at(Coord::new(3, 3)).and_then(|t| t.slot(SlotKind::Item)), Some(a));
        assert_eq!(items.get(a), Some(&40));
    }

    #[test]
    fn errors_render_readably() {
        let e = GridError::CapacityExhausted { capacity: 15 };
        assert_eq!(e.to_string(), "arena at capacity (15) with no free slot");
        let e = GridError::HandleOutOfRange {
            kind: SlotKind::Npc,
            handle: 300,
            max: 255,
        };
        assert!(e.to_string().contains("npc handle 300"));
    }

    #[test]
    fn tile_serializes_to_json() {
        let t = Tile::new(Biome::Glacial);
        let json = serde_json::to_string(&t).unwrap();
        let back: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
