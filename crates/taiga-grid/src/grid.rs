//! Flat row-major storage of packed tiles.
//!
//! The grid is allocated once and never resized. Cells are stored encoded
//! ([`PackedTile`]) and decoded on read, so the memory cost is six bytes per
//! cell regardless of what occupies it.

use crate::coord::{Coord, Rect};
use crate::tile::{PackedTile, Tile};

/// A fixed-size rectangular grid of tiles.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<PackedTile>,
}

impl Grid {
    /// A grid of `width × height` empty tiles of the default biome.
    ///
    /// Negative dimensions produce an empty grid.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let cells = vec![Tile::default().encode(); width as usize * height as usize];
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `c` lies on the grid.
    #[inline]
    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.x < self.width && c.y >= 0 && c.y < self.height
    }

    /// Row-major index of `c`, or `None` off-grid.
    #[inline]
    pub fn index(&self, c: Coord) -> Option<usize> {
        self.in_bounds(c)
            .then(|| c.y as usize * self.width as usize + c.x as usize)
    }

    /// Inverse of [`index`](Self::index).
    pub fn coord_of(&self, index: usize) -> Option<Coord> {
        if index >= self.cells.len() {
            return None;
        }
        let w = self.width as usize;
        Some(Coord::new((index % w) as i32, (index / w) as i32))
    }

    /// Decoded tile at `c`, or `None` off-grid.
    #[inline]
    pub fn at(&self, c: Coord) -> Option<Tile> {
        self.index(c).map(|i| Tile::decode(&self.cells[i]))
    }

    /// Overwrite the tile at `c`. Off-grid writes are ignored and return
    /// `false`.
    pub fn write(&mut self, c: Coord, tile: Tile) -> bool {
        match self.index(c) {
            Some(i) => {
                self.cells[i] = tile.encode();
                true
            }
            None => false,
        }
    }

    /// Clamp `rect` to the grid. `None` if nothing of it is on the grid.
    pub fn clamp(&self, rect: Rect) -> Option<Rect> {
        rect.clamp_to(self.width, self.height)
    }

    /// Every on-grid cell of `rect`, row-major, with its decoded tile.
    pub fn within(&self, rect: Rect) -> impl Iterator<Item = (Coord, Tile)> + '_ {
        self.clamp(rect)
            .into_iter()
            .flat_map(Rect::cells)
            .filter_map(move |c| self.at(c).map(|t| (c, t)))
    }

    /// BLAKE3 hex digest of the packed cell bytes.
    ///
    /// Two grids with equal digests hold identical tiles; used to check that a
    /// rejected mutation left the grid untouched.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        for cell in &self.cells {
            hasher.update(cell);
        }
        hasher.finalize().to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
