//! Local flow fields for NPC pathfinding.
//!
//! A [`MapView`] is a snapshot of passability inside a rectangle around one
//! NPC. [`MapView::calc`] runs a breadth-first expansion seeded at every
//! target at once and records, for each passable cell, the number of
//! king-moves to the nearest target. Cells that are impassable or cannot
//! reach any target keep the [`UNRANKED`] sentinel.
//!
//! An NPC walks toward its targets by stepping to
//! [`lowest_neighbor`](MapView::lowest_neighbor) and away from them by
//! stepping to [`highest_neighbor`](MapView::highest_neighbor). Neither ever
//! picks an unranked cell.
//!
//! Views are owned by the NPC that built them and are rebuilt from scratch
//! once they are older than the configured staleness window; in between,
//! [`recalc`](MapView::recalc) refreshes the ranks over the same snapshot.

use std::collections::VecDeque;
use std::time::Duration;

use taiga_grid::coord::{Coord, Rect, SURROUNDING};

/// Rank of a cell that no target can reach.
pub const UNRANKED: u32 = u32::MAX;

/// A bounded passability snapshot plus its distance field.
#[derive(Clone, Debug)]
pub struct MapView {
    bounds: Rect,
    passable: Vec<bool>,
    ranks: Vec<u32>,
    targets: Vec<Coord>,
    built_at: Duration,
}

impl MapView {
    /// Snapshot `passable` over `bounds`. `bounds` must already be clamped to
    /// the world; every cell in it is queried once.
    pub fn new(bounds: Rect, passable: impl Fn(Coord) -> bool, built_at: Duration) -> Self {
        let passable: Vec<bool> = bounds.cells().map(passable).collect();
        let ranks = vec![UNRANKED; passable.len()];
        Self {
            bounds,
            passable,
            ranks,
            targets: Vec::new(),
            built_at,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn built_at(&self) -> Duration {
        self.built_at
    }

    /// True once the view is older than `staleness` at time `now`.
    pub fn is_stale(&self, now: Duration, staleness: Duration) -> bool {
        now.saturating_sub(self.built_at) > staleness
    }

    /// Targets used by the last calculation.
    pub fn targets(&self) -> &[Coord] {
        &self.targets
    }

    /// Passability at view-relative coordinates. Outside the view is
    /// impassable.
    pub fn passable(&self, rel_x: i32, rel_y: i32) -> bool {
        self.local_index(self.bounds.min.offset(rel_x, rel_y))
            .is_some_and(|i| self.passable[i])
    }

    /// Rank of an absolute coordinate; [`UNRANKED`] outside the view.
    pub fn rank(&self, c: Coord) -> u32 {
        self.local_index(c).map_or(UNRANKED, |i| self.ranks[i])
    }

    fn local_index(&self, c: Coord) -> Option<usize> {
        if !self.bounds.contains(c) {
            return None;
        }
        let w = self.bounds.width() as usize;
        let x = (c.x - self.bounds.min.x) as usize;
        let y = (c.y - self.bounds.min.y) as usize;
        Some(y * w + x)
    }

    /// Compute the distance field for `targets`.
    ///
    /// Targets outside the view or on impassable cells seed nothing.
    pub fn calc(&mut self, targets: &[Coord]) {
        self.targets.clear();
        self.targets.extend_from_slice(targets);
        self.ranks.fill(UNRANKED);

        let mut frontier = VecDeque::new();
        for &t in targets {
            if let Some(i) = self.local_index(t) {
                if self.passable[i] && self.ranks[i] != 0 {
                    self.ranks[i] = 0;
                    frontier.push_back(t);
                }
            }
        }

        while let Some(c) = frontier.pop_front() {
            let next_rank = self.rank(c) + 1;
            for (dx, dy) in SURROUNDING {
                let n = c.offset(dx, dy);
                let Some(i) = self.local_index(n) else {
                    continue;
                };
                if self.passable[i] && self.ranks[i] == UNRANKED {
                    self.ranks[i] = next_rank;
                    frontier.push_back(n);
                }
            }
        }
    }

    /// Refresh the field over the existing snapshot. A no-op when the targets
    /// have not moved.
    pub fn recalc(&mut self, targets: &[Coord]) {
        if self.targets == targets {
            return;
        }
        self.calc(targets);
    }

    /// The neighbour with the smallest rank, or `from` itself when no
    /// neighbour is strictly closer to a target. Ties go to the first
    /// neighbour in [`SURROUNDING`] order.
    pub fn lowest_neighbor(&self, from: Coord) -> Coord {
        let mut best = from;
        let mut best_rank = self.rank(from);
        for n in from.surrounding() {
            let r = self.rank(n);
            if r < best_rank {
                best = n;
                best_rank = r;
            }
        }
        best
    }

    /// The neighbour with the largest finite rank, or `from` itself when no
    /// ranked neighbour is farther from every target than `from` is.
    pub fn highest_neighbor(&self, from: Coord) -> Coord {
        let here = self.rank(from);
        let mut best = from;
        let mut best_rank = if here == UNRANKED { 0 } else { here };
        for n in from.surrounding() {
            let r = self.rank(n);
            if r != UNRANKED && r > best_rank {
                best = n;
                best_rank = r;
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn open_view(size: i32) -> MapView {
        let bounds = Rect::from_corners(Coord::new(0, 0), Coord::new(size - 1, size - 1));
        MapView::new(bounds, |_| true, Duration::ZERO)
    }

    #[test]
    fn neighbours_of_a_target_rank_one() {
        let mut view = open_view(9);
        let t = Coord::new(4, 4);
        view.calc(&[t]);
        assert_eq!(view.rank(t), 0);
        for n in t.surrounding() {
            assert_eq!(view.rank(n), 1);
        }
        assert_eq!(view.rank(Coord::new(0, 0)), 4);
    }

    #[test]
    fn multi_source_takes_the_nearest() {
        let mut view = open_view(11);
        view.calc(&[Coord::new(0, 0), Coord::new(10, 0)]);
        assert_eq!(view.rank(Coord::new(2, 0)), 2);
        assert_eq!(view.rank(Coord::new(8, 0)), 2);
        assert_eq!(view.rank(Coord::new(5, 0)), 5);
    }

    #[test]
    fn walls_are_unranked_and_detoured() {
        // Vertical wall at x = 2 with a gap at y = 4.
        let bounds = Rect::from_corners(Coord::new(0, 0), Coord::new(4, 4));
        let mut view = MapView::new(bounds, |c| !(c.x == 2 && c.y < 4), Duration::ZERO);
        view.calc(&[Coord::new(0, 0)]);
        assert_eq!(view.rank(Coord::new(2, 0)), UNRANKED);
        assert!(!view.passable(2, 0));
        assert!(view.passable(2, 4));
        assert_eq!(view.rank(Coord::new(2, 4)), 4);
        assert_eq!(view.rank(Coord::new(3, 0)), 8);
    }

    #[test]
    fn lowest_neighbor_descends() {
        let mut view = open_view(9);
        view.calc(&[Coord::new(4, 4)]);
        let mut at = Coord::new(0, 8);
        let mut steps = 0;
        while at != Coord::new(4, 4) {
            let next = view.lowest_neighbor(at);
            assert!(view.rank(next) < view.rank(at));
            at = next;
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert_eq!(view.lowest_neighbor(at), at, "a target is a local minimum");
    }

    #[test]
    fn highest_neighbor_flees_and_stops_in_corner() {
        let mut view = open_view(5);
        view.calc(&[Coord::new(1, 1)]);
        let step = view.highest_neighbor(Coord::new(2, 2));
        assert_eq!(view.rank(step), 2);
        assert_eq!(view.highest_neighbor(Coord::new(4, 4)), Coord::new(4, 4));
    }

    #[test]
    fn unreachable_region_never_chosen() {
        let bounds = Rect::from_corners(Coord::new(0, 0), Coord::new(4, 0));
        let mut view = MapView::new(bounds, |c| c.x != 2, Duration::ZERO);
        view.calc(&[Coord::new(0, 0)]);
        assert_eq!(view.rank(Coord::new(3, 0)), UNRANKED);
        assert_eq!(view.highest_neighbor(Coord::new(1, 0)), Coord::new(1, 0));
        assert_eq!(view.lowest_neighbor(Coord::new(3, 0)), Coord::new(3, 0));
    }

    #[test]
    fn recalc_with_same_targets_keeps_ranks() {
        let mut view = open_view(5);
        view.calc(&[Coord::new(0, 0)]);
        view.recalc(&[Coord::new(0, 0)]);
        assert_eq!(view.rank(Coord::new(4, 4)), 4);
        view.recalc(&[Coord::new(4, 4)]);
        assert_eq!(view.rank(Coord::new(4, 4)), 0);
        assert_eq!(view.targets(), &[Coord::new(4, 4)]);
    }

    #[test]
    fn relative_passability_uses_view_origin() {
        let bounds = Rect::from_corners(Coord::new(10, 10), Coord::new(12, 12));
        let view = MapView::new(bounds, |c| c != Coord::new(11, 11), Duration::ZERO);
        assert!(view.passable(0, 0));
        assert!(!view.passable(1, 1));
        assert!(!view.passable(5, 5), "outside the view");
        assert!(!view.passable(-1, 0));
    }

    #[test]
    fn staleness_window() {
        let view = MapView::new(
            Rect::from_corners(Coord::new(0, 0), Coord::new(0, 0)),
            |_| true,
            Duration::from_secs(1),
        );
        let window = Duration::from_secs(2);
        assert!(!view.is_stale(Duration::from_secs(3), window));
        assert!(view.is_stale(Duration::from_millis(3001), window));
    }
}
