//! Recursive shadowcasting field of view.
//!
//! The plane around the origin is split into eight octants. Each octant is
//! scanned row by row ("depth" away from the origin) between a low and a high
//! slope, starting at `0..1`. Every cell the scan touches is visible. When
//! the scan meets an opaque cell after a run of open cells, the open run is
//! continued one row further out with its slope window clipped to the
//! blocker, and the scan of the current row resumes past the blocker. When a
//! row ends on an open cell, scanning continues on the next row with the
//! current window.
//!
//! Visible cells are weighted by `depth / radius`, a value in `0.0..1.0` that
//! renderers use for dimming. A cell is only recorded when it is on the map
//! and strictly closer than `radius` by Euclidean distance. The origin is
//! always visible with weight `0.0`.
//!
//! [`compute`] owns its accumulator, so concurrent calls for different players
//! share nothing.

use std::collections::HashMap;

use taiga_grid::coord::Coord;

/// Visible cells and their normalized distance.
pub type VisibleSet = HashMap<Coord, f64>;

/// The two questions shadowcasting asks of a map.
pub trait Opacity {
    fn in_bounds(&self, c: Coord) -> bool;
    /// Only asked for in-bounds cells.
    fn is_opaque(&self, c: Coord) -> bool;
}

/// Compute the cells visible from `origin` within `radius`.
///
/// A non-positive radius sees only the origin.
pub fn compute<M: Opacity + ?Sized>(map: &M, origin: Coord, radius: i32) -> VisibleSet {
    let mut visible = VisibleSet::new();
    visible.insert(origin, 0.0);
    if radius <= 0 {
        return visible;
    }
    let mut scan = Scan {
        map,
        origin,
        radius,
        visible: &mut visible,
    };
    for octant in 0..8u8 {
        scan.row(1, 0.0, 1.0, octant);
    }
    visible
}

struct Scan<'a, M: ?Sized> {
    map: &'a M,
    origin: Coord,
    radius: i32,
    visible: &'a mut VisibleSet,
}

impl<M: Opacity + ?Sized> Scan<'_, M> {
    fn row(&mut self, depth: i32, mut low_slope: f64, high_slope: f64, octant: u8) {
        if depth > self.radius {
            return;
        }
        let d = f64::from(depth);
        let low = (low_slope * d + 0.5).floor() as i32;
        let high = (high_slope * d + 0.5).floor() as i32;

        let mut in_gap = false;
        for height in low..=high {
            let c = transform(self.origin, depth, height, octant);
            let on_map = self.map.in_bounds(c);
            if on_map && within_radius(self.origin, c, self.radius) {
                self.visible.insert(c, d / f64::from(self.radius));
            }

            if on_map && self.map.is_opaque(c) {
                if in_gap {
                    let h = f64::from(height);
                    self.row(depth + 1, low_slope, (h - 0.5) / d, octant);
                }
                low_slope = (f64::from(height) + 0.5) / d;
                in_gap = false;
            } else {
                in_gap = true;
                if height == high {
                    self.row(depth + 1, low_slope, high_slope, octant);
                }
            }
        }
    }
}

/// Map (depth, height) in `octant` to a grid coordinate. Bit 0 mirrors the
/// depth axis, bit 1 mirrors the height axis, bit 2 swaps them.
#[inline]
fn transform(origin: Coord, depth: i32, height: i32, octant: u8) -> Coord {
    let d = if octant & 0b001 != 0 { -depth } else { depth };
    let h = if octant & 0b010 != 0 { -height } else { height };
    if octant & 0b100 != 0 {
        origin.offset(h, d)
    } else {
        origin.offset(d, h)
    }
}

#[inline]
fn within_radius(origin: Coord, c: Coord, radius: i32) -> bool {
    let dx = i64::from(c.x - origin.x);
    let dy = i64::from(c.y - origin.y);
    let r = i64::from(radius);
    dx * dx + dy * dy < r * r
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
