//! Per-archetype NPC turns.
//!
//! Each turn reads and mutates the world through the same primitives player
//! actions use, under the same lock. Both archetypes wander by a random
//! offset in `-1..=1` on each axis while they have nothing to react to.
//!
//! - **Defensive**: once terrorized, flees at twice its base speed by
//!   stepping to the highest-ranked neighbour of its flow field. When the
//!   nearest threat is farther than the activation radius (Chebyshev), it
//!   forgets its targets and calms down to `Hungry`.
//! - **Aggressive**: once it has targets, pursues at three times its base
//!   speed by stepping to the lowest-ranked neighbour. If that step lands on
//!   a target it attacks instead of moving.

use std::time::Duration;

use rand::Rng;
use taiga_grid::arena::Handle;
use taiga_grid::coord::{Coord, Rect};
use tracing::trace;

use crate::mapview::MapView;
use crate::npc::{Archetype, Mood};
use crate::player::PlayerId;
use crate::state::WorldState;

impl WorldState {
    /// Run one NPC's turn if its speed gate is open. Returns whether it
    /// acted.
    pub(crate) fn tick_npc(&mut self, handle: Handle, now: Duration) -> bool {
        let Some(npc) = self.npcs.get(handle) else {
            return false;
        };
        if !npc.ready(now) {
            return false;
        }
        match npc.archetype() {
            Archetype::Defensive => self.defensive_turn(handle, now),
            Archetype::Aggressive => self.aggressive_turn(handle, now),
        }
        if let Some(npc) = self.npcs.get_mut(handle) {
            npc.last_moved = Some(now);
            trace!(npc = %handle, mood = ?npc.mood, at = %npc.location, "npc turn");
        }
        true
    }

    fn defensive_turn(&mut self, handle: Handle, now: Duration) {
        let Some(npc) = self.npcs.get_mut(handle) else {
            return;
        };
        if npc.mood != Mood::Terrorized || npc.targets.is_empty() {
            npc.mood = Mood::Hungry;
            npc.speed = npc.base_speed();
            self.wander(handle);
            return;
        }
        npc.speed = npc.base_speed() * 2.0;
        self.refresh_map_view(handle, now);

        if let Some((from, next)) = self.next_step(handle, MapView::highest_neighbor) {
            if next != from {
                self.move_npc(handle, next);
            }
        }

        let radius = self.config.activation_radius;
        let escaped = self
            .distance_to_closest_target(handle)
            .map_or(true, |d| d > radius);
        if escaped {
            if let Some(npc) = self.npcs.get_mut(handle) {
                npc.mood = Mood::Hungry;
                npc.forget_targets();
            }
        }
    }

    fn aggressive_turn(&mut self, handle: Handle, now: Duration) {
        let Some(npc) = self.npcs.get_mut(handle) else {
            return;
        };
        if npc.targets.is_empty() {
            npc.mood = Mood::Calm;
            npc.speed = npc.base_speed();
            self.wander(handle);
            return;
        }
        npc.mood = Mood::Enraged;
        npc.speed = npc.base_speed() * 3.0;
        self.refresh_map_view(handle, now);

        let Some((from, next)) = self.next_step(handle, MapView::lowest_neighbor) else {
            return;
        };
        match self.target_at(handle, next) {
            Some(victim) => {
                let damage = self.roll_damage(handle);
                self.npc_attacks_player(handle, &victim, damage);
            }
            None if next != from => {
                self.move_npc(handle, next);
            }
            None => {}
        }
    }

    /// Current location and the step `pick` chooses from the NPC's view.
    fn next_step(&self, handle: Handle, pick: fn(&MapView, Coord) -> Coord) -> Option<(Coord, Coord)> {
        let npc = self.npcs.get(handle)?;
        let view = npc.map_view.as_ref()?;
        Some((npc.location, pick(view, npc.location)))
    }

    /// Step to a random neighbour, or stay put when the roll is `(0, 0)` or
    /// the cell is taken.
    fn wander(&mut self, handle: Handle) {
        let Some(from) = self.npcs.get(handle).map(|n| n.location) else {
            return;
        };
        let dx = self.rng.gen_range(-1..=1);
        let dy = self.rng.gen_range(-1..=1);
        self.move_npc(handle, from.offset(dx, dy));
    }

    /// Prune targets to present players, then rebuild the flow field if it is
    /// missing or stale, or refresh it over the existing snapshot otherwise.
    fn refresh_map_view(&mut self, handle: Handle, now: Duration) {
        let staleness = self.config.path_staleness();
        let radius = self.config.activation_radius;
        let registry = &self.registry;
        let Some(npc) = self.npcs.get_mut(handle) else {
            return;
        };
        npc.targets.retain(|id, _| {
            registry
                .get(id)
                .is_some_and(|r| r.player.is_online() && !r.player.dead)
        });
        let points: Vec<Coord> = npc
            .targets
            .keys()
            .filter_map(|id| registry.get(id).map(|r| r.player.location))
            .collect();

        if let Some(view) = npc.map_view.as_mut() {
            if !view.is_stale(now, staleness) {
                view.recalc(&points);
                return;
            }
        }

        let at = npc.location;
        let Some(bounds) = self.grid.clamp(Rect::around(at, radius)) else {
            return;
        };
        let mut view = MapView::new(bounds, |c| self.walkable(c), now);
        view.calc(&points);
        if let Some(npc) = self.npcs.get_mut(handle) {
            npc.map_view = Some(view);
        }
    }

    /// Chebyshev distance to the nearest present target.
    fn distance_to_closest_target(&self, handle: Handle) -> Option<i32> {
        let npc = self.npcs.get(handle)?;
        npc.targets
            .keys()
            .filter_map(|id| self.registry.get(id))
            .filter(|r| r.player.is_online() && !r.player.dead)
            .map(|r| npc.location.chebyshev(r.player.location))
            .min()
    }

    /// The present target standing on `c`, if any.
    fn target_at(&self, handle: Handle, c: Coord) -> Option<PlayerId> {
        let npc = self.npcs.get(handle)?;
        npc.targets
            .keys()
            .find(|id| {
                self.registry
                    .get(*id)
                    .is_some_and(|r| r.player.is_online() && !r.player.dead && r.player.location == c)
            })
            .cloned()
    }

    /// Damage in `min..max`, or `min` when the range is empty.
    fn roll_damage(&mut self, handle: Handle) -> i32 {
        let Some((min, max)) = self.npcs.get(handle).map(|n| n.spec().damage) else {
            return 0;
        };
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::item::ItemKind;
    use crate::npc::{Npc, NpcSpecies, TargetWeight};
    use crate::player::PlayerRecord;
    use crate::worldgen::WorldSeed;
    use taiga_grid::tile::Biome;

    fn state(size: i32) -> WorldState {
        WorldState::from_seed(EngineConfig::default(), &WorldSeed::uniform(size, Biome::Boreal)).unwrap()
    }

    fn add_player(s: &mut WorldState, id: &str, at: Coord) -> PlayerId {
        let id = PlayerId::from(id);
        let record = PlayerRecord::create(id.clone(), id.as_str(), at, &s.config);
        s.registry.insert(id.clone(), record);
        s.attach_player(&id, at).unwrap();
        id
    }

    #[test]
    fn first_turn_is_immediate_then_gated() {
        let mut s = state(20);
        let h = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(10, 10))).unwrap();
        assert!(s.tick_npc(h, Duration::from_millis(100)));
        assert!(!s.tick_npc(h, Duration::from_millis(200)));
        assert!(s.tick_npc(h, Duration::from_millis(1000)));
    }

    #[test]
    fn calm_rabbit_wanders_at_most_one_cell() {
        let mut s = state(20);
        let h = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(10, 10))).unwrap();
        for i in 0..20u64 {
            let before = s.npc(h).unwrap().location;
            s.tick_npc(h, Duration::from_secs(i));
            let after = s.npc(h).unwrap().location;
            assert!(before.chebyshev(after) <= 1);
            assert_eq!(s.npc(h).unwrap().mood, Mood::Hungry);
        }
    }

    #[test]
    fn terrorized_rabbit_steps_away() {
        let mut s = state(30);
        let id = add_player(&mut s, "a", Coord::new(10, 10));
        let h = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(11, 11))).unwrap();
        s.npcs.get_mut(h).unwrap().attacked(ItemKind::BareHands, id);
        s.tick_npc(h, Duration::ZERO);
        let npc = s.npc(h).unwrap();
        assert_eq!(npc.location.chebyshev(Coord::new(10, 10)), 2);
        assert_eq!(npc.mood, Mood::Terrorized);
        assert!((npc.speed - 0.4).abs() < 1e-9);
    }

    #[test]
    fn rabbit_whose_threat_left_calms_down() {
        let mut s = state(30);
        let id = add_player(&mut s, "a", Coord::new(10, 10));
        let h = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(11, 11))).unwrap();
        s.npcs.get_mut(h).unwrap().attacked(ItemKind::BareHands, id.clone());
        s.detach_player(&id);
        s.tick_npc(h, Duration::ZERO);
        let npc = s.npc(h).unwrap();
        assert_eq!(npc.mood, Mood::Hungry);
        assert!(npc.targets.is_empty());
        assert!(npc.map_view.is_none());
    }

    #[test]
    fn bear_closes_in_then_attacks() {
        let mut s = state(30);
        let id = add_player(&mut s, "a", Coord::new(10, 10));
        let h = s.spawn_npc(Npc::new(NpcSpecies::BrownBear, Coord::new(13, 10))).unwrap();
        s.npcs.get_mut(h).unwrap().targets.insert(id.clone(), TargetWeight::Enemy);

        let target = Coord::new(10, 10);
        s.tick_npc(h, Duration::ZERO);
        assert_eq!(s.npc(h).unwrap().location.chebyshev(target), 2);
        assert_eq!(s.npc(h).unwrap().mood, Mood::Enraged);
        s.tick_npc(h, Duration::from_secs(1));
        let adjacent = s.npc(h).unwrap().location;
        assert_eq!(adjacent.chebyshev(target), 1);

        s.tick_npc(h, Duration::from_secs(2));
        assert_eq!(s.npc(h).unwrap().location, adjacent, "attacks instead of moving");
        let p = s.player(&id).unwrap();
        assert!(p.dead || p.health <= 10);
    }

    #[test]
    fn bear_without_targets_is_calm() {
        let mut s = state(10);
        let h = s.spawn_npc(Npc::new(NpcSpecies::BrownBear, Coord::new(5, 5))).unwrap();
        s.tick_npc(h, Duration::ZERO);
        assert_eq!(s.npc(h).unwrap().mood, Mood::Calm);
    }

    #[test]
    fn fresh_view_is_reused_until_stale() {
        let mut s = state(30);
        let id = add_player(&mut s, "a", Coord::new(10, 10));
        let h = s.spawn_npc(Npc::new(NpcSpecies::Rabbit, Coord::new(12, 12))).unwrap();
        s.npcs.get_mut(h).unwrap().attacked(ItemKind::BareHands, id);
        s.refresh_map_view(h, Duration::ZERO);
        let built = s.npc(h).and_then(|n| n.map_view.as_ref()).map(MapView::built_at);
        s.refresh_map_view(h, Duration::from_secs(2));
        assert_eq!(s.npc(h).and_then(|n| n.map_view.as_ref()).map(MapView::built_at), built);
        s.refresh_map_view(h, Duration::from_millis(2001));
        assert_eq!(
            s.npc(h).and_then(|n| n.map_view.as_ref()).map(MapView::built_at),
            Some(Duration::from_millis(2001))
        );
    }
}
