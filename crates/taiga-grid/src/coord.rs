//! Integer grid coordinates and rectangles.
//!
//! The zero coordinate is a real cell. Anything that may be "unset" must wrap
//! its coordinate in an `Option`, never use `(0, 0)` as a marker.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// A cell position on the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Offsets of the four orthogonal neighbours, in search order.
pub const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];

/// Offsets of all eight neighbours, in a fixed order so tie-breaking is
/// deterministic.
pub const SURROUNDING: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl Coord {
    /// Construct a coordinate.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The coordinate shifted by `(dx, dy)`.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Straight-line distance.
    pub fn euclidean(self, other: Coord) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// King-move distance: `max(|dx|, |dy|)`.
    pub fn chebyshev(self, other: Coord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Taxicab distance: `|dx| + |dy|`.
    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// The four orthogonal neighbours (may be out of any grid's bounds).
    pub fn orthogonal_neighbors(self) -> impl Iterator<Item = Coord> {
        ORTHOGONAL.into_iter().map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// All eight neighbours (may be out of any grid's bounds).
    pub fn surrounding(self) -> impl Iterator<Item = Coord> {
        SURROUNDING.into_iter().map(move |(dx, dy)| self.offset(dx, dy))
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// An inclusive rectangle `min..=max` on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min: Coord,
    pub max: Coord,
}

impl Rect {
    /// Rectangle from two corners; the corners are normalised so `min <= max`.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self {
            min: Coord::new(a.x.min(b.x), a.y.min(b.y)),
            max: Coord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Square of half-extent `radius` centred on `center`.
    pub fn around(center: Coord, radius: i32) -> Self {
        Self::from_corners(
            center.offset(-radius, -radius),
            center.offset(radius, radius),
        )
    }

    /// Clamp both corners into `0..width` × `0..height`.
    ///
    /// Returns `None` when the grid is empty or the rectangle lies entirely
    /// outside it.
    pub fn clamp_to(self, width: i32, height: i32) -> Option<Self> {
        if width <= 0 || height <= 0 {
            return None;
        }
        if self.max.x < 0 || self.max.y < 0 || self.min.x >= width || self.min.y >= height {
            return None;
        }
        Some(Self {
            min: Coord::new(self.min.x.clamp(0, width - 1), self.min.y.clamp(0, height - 1)),
            max: Coord::new(self.max.x.clamp(0, width - 1), self.max.y.clamp(0, height - 1)),
        })
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }

    /// Row-major iteration over every cell.
    pub fn cells(self) -> impl Iterator<Item = Coord> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| Coord::new(x, y)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        let a = Coord::new(0, 0);
        let b = Coord::new(3, 4);
        assert_eq!(a.euclidean(b), 5.0);
        assert_eq!(a.chebyshev(b), 4);
        assert_eq!(a.manhattan(b), 7);
    }

    #[test]
    fn zero_coord_is_ordinary() {
        assert_eq!(Coord::default(), Coord::new(0, 0));
        assert_eq!(Coord::default().orthogonal_neighbors().count(), 4);
    }

    #[test]
    fn clamp_rect_to_grid() {
        let r = Rect::around(Coord::new(1, 1), 3).clamp_to(10, 10).unwrap();
        assert_eq!(r.min, Coord::new(0, 0));
        assert_eq!(r.max, Coord::new(4, 4));
        assert_eq!(r.width(), 5);
        assert_eq!(r.cells().count(), 25);
    }

    #[test]
    fn clamp_rect_outside_grid_is_none() {
        let r = Rect::from_corners(Coord::new(20, 20), Coord::new(25, 25));
        assert!(r.clamp_to(10, 10).is_none());
        assert!(Rect::around(Coord::new(0, 0), 1).clamp_to(0, 0).is_none());
    }

    #[test]
    fn rect_cells_are_row_major() {
        let r = Rect::from_corners(Coord::new(1, 1), Coord::new(0, 0));
        let cells: Vec<Coord> = r.cells().collect();
        assert_eq!(
            cells,
            vec![
                Coord::new(0, 0),
                Coord::new(1, 0),
                Coord::new(0, 1),
                Coord::new(1, 1)
            ]
        );
    }
}
