//! End-to-end scenarios driven through the public `World` facade and a
//! manually stepped tick loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use taiga_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    world: Arc<World>,
    clock: Arc<ManualClock>,
    ticks: TickLoop,
}

impl Harness {
    fn new(seed: WorldSeed) -> Self {
        let clock = Arc::new(ManualClock::new());
        let world = Arc::new(World::from_seed(EngineConfig::default(), &seed, clock.clone()).unwrap());
        let ticks = TickLoop::new(Arc::clone(&world), TickConfig::default());
        Self { world, clock, ticks }
    }

    /// Let the move cooldown lapse without ticking.
    fn wait(&self) {
        self.clock.advance(Duration::from_millis(100));
    }

    fn tick(&mut self) -> TickReport {
        self.ticks.advance(&self.clock)
    }

    /// Join at `at`, pick up the stack lying there and wield it.
    fn join_armed(&self, id: &PlayerId, name: &str, at: Coord) {
        assert_eq!(self.world.join_at(id, name, at).unwrap(), at);
        assert!(matches!(self.world.interact(id).unwrap(), InteractOutcome::PickedUp(1)));
        let wielded = self.world.activate_item(id, 0).unwrap();
        assert!(matches!(wielded, Some(ActivateOutcome::Wielded(_))));
        self.wait();
    }
}

fn boreal_with_axe(size: i32, axe_at: Coord) -> WorldSeed {
    let mut seed = WorldSeed::uniform(size, Biome::Boreal);
    seed.items.push((axe_at, ItemStack::new(ItemKind::StoneAxe, 1)));
    seed
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn wounded_rabbit_flees_then_calms_down() {
    let player_at = Coord::new(5, 4);
    let mut seed = boreal_with_axe(40, player_at);
    seed.npcs.push((Coord::new(5, 5), NpcSpecies::Rabbit));
    let mut h = Harness::new(seed);
    let id = PlayerId::from("hunter");
    h.join_armed(&id, "Hunter", player_at);

    let rabbit = h.world.npc_at(Coord::new(5, 5)).unwrap();
    let outcome = h.world.move_player(&id, 0, 1).unwrap();
    assert_eq!(outcome, MoveOutcome::Attacked(AttackOutcome::Hit { damage: 10 }));
    let npc = h.world.npc(rabbit).unwrap();
    assert_eq!(npc.mood, Mood::Terrorized);
    assert_eq!(npc.health, 20);
    assert!(npc.targets.contains_key(&id));

    h.tick();
    let fled = h.world.npc(rabbit).unwrap();
    assert!(fled.location.chebyshev(player_at) > 1, "first turn steps away");
    assert!(fled.speed > NpcSpecies::Rabbit.spec().base_speed);

    let mut calmed = false;
    for _ in 0..600 {
        h.tick();
        let npc = h.world.npc(rabbit).unwrap();
        if npc.targets.is_empty() {
            assert_eq!(npc.mood, Mood::Hungry);
            assert!(npc.location.chebyshev(player_at) > EngineConfig::default().activation_radius);
            calmed = true;
            break;
        }
    }
    assert!(calmed, "rabbit never escaped");
    assert_eq!(h.world.player(&id).unwrap().location, player_at);
}

#[test]
fn felling_a_pine_drops_wood_and_removes_the_tree() {
    let mut seed = boreal_with_axe(10, Coord::new(2, 2));
    let pine_at = Coord::new(3, 2);
    seed.flora.push((pine_at, FloraSpecies::ScotsPine));
    let h = Harness::new(seed);
    let id = PlayerId::from("woodcutter");
    h.join_armed(&id, "Woodcutter", Coord::new(2, 2));

    let felled = h.world.harvest(&id, pine_at).unwrap().unwrap();
    assert!(felled.depleted);
    assert!(felled.success);
    assert_eq!(felled.yields, vec![ItemStack::new(ItemKind::PineWood, 4)]);
    assert_eq!(h.world.flora_at(pine_at), None);
    assert_eq!(h.world.item_at(pine_at), Some(ItemStack::new(ItemKind::PineWood, 4)));

    let events = h.world.render_player_events(&id).unwrap();
    assert!(events.contains("You harvested the Scots Pine"), "{events}");

    h.wait();
    assert_eq!(h.world.harvest(&id, pine_at).unwrap(), None);
}

#[test]
fn reconnecting_resumes_location_and_inventory() {
    let mut seed = WorldSeed::uniform(20, Biome::Boreal);
    seed.items.push((Coord::new(9, 10), ItemStack::new(ItemKind::PineBark, 2)));
    let h = Harness::new(seed);
    let id = PlayerId::from("ana");
    h.world.join_at(&id, "Ana", Coord::new(9, 10)).unwrap();
    assert_eq!(h.world.interact(&id).unwrap(), InteractOutcome::PickedUp(2));
    h.wait();
    assert_eq!(h.world.move_player(&id, 1, 0).unwrap(), MoveOutcome::Moved(Coord::new(10, 10)));

    h.world.disconnect(&id).unwrap();
    assert!(!h.world.state().occupied(Coord::new(10, 10)));
    assert_eq!(h.world.render_map(&id, 3, 3).unwrap().rows.len(), 3);

    assert_eq!(h.world.join(&id, "Ana").unwrap(), Coord::new(10, 10));
    assert_eq!(h.world.inventory(&id).unwrap(), vec![ItemStack::new(ItemKind::PineBark, 2)]);
    let events = h.world.world_events();
    assert!(events.contains("Ana left."));
    assert_eq!(events.matches("Ana joined.").count(), 2);
}

#[test]
fn enraged_bear_kills_and_the_player_respawns() {
    let mut seed = WorldSeed::uniform(20, Biome::Boreal);
    seed.npcs.push((Coord::new(6, 5), NpcSpecies::BrownBear));
    let mut h = Harness::new(seed);
    let id = PlayerId::from("ana");
    h.world.join_at(&id, "Ana", Coord::new(5, 5)).unwrap();

    let deaths = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&deaths);
    h.world.on_death(&id, move |msg| sink.lock().push(msg.to_owned()));

    let outcome = h.world.move_player(&id, 1, 0).unwrap();
    assert_eq!(outcome, MoveOutcome::Attacked(AttackOutcome::Ineffective));
    let bear = h.world.npc_at(Coord::new(6, 5)).unwrap();
    assert_eq!(h.world.npc(bear).unwrap().mood, Mood::Enraged);

    for _ in 0..20 {
        h.tick();
        if h.world.player(&id).unwrap().dead {
            break;
        }
    }
    let body = h.world.player(&id).unwrap();
    assert!(body.dead);
    assert!(!body.is_online());
    assert_eq!(*deaths.lock(), vec!["You died".to_owned()]);
    assert!(h.world.world_events().contains("Ana died."));
    assert_eq!(h.world.move_player(&id, 0, 1).unwrap(), MoveOutcome::Inactive);

    assert!(h.world.active_npcs().is_empty(), "nobody left to wake the bear");

    let at = h.world.join(&id, "Ana").unwrap();
    let revived = h.world.player(&id).unwrap();
    assert!(!revived.dead);
    assert_eq!(revived.location, at);
    assert_eq!(revived.health, revived.max_health);
    assert!(revived.inventory.is_empty());
}

#[test]
fn far_away_npcs_stay_frozen() {
    let mut seed = WorldSeed::uniform(64, Biome::Boreal);
    seed.npcs.push((Coord::new(50, 50), NpcSpecies::Rabbit));
    seed.npcs.push((Coord::new(12, 12), NpcSpecies::Rabbit));
    let mut h = Harness::new(seed);
    h.world.join_at(&PlayerId::from("a"), "a", Coord::new(10, 10)).unwrap();

    let far = h.world.npc_at(Coord::new(50, 50)).unwrap();
    assert_eq!(h.world.active_npcs().len(), 1);
    let turns: usize = (0..50).map(|_| h.tick().npc_turns).sum();
    assert!(turns >= 1);
    let frozen = h.world.npc(far).unwrap();
    assert_eq!(frozen.location, Coord::new(50, 50));
    assert_eq!(frozen.last_moved, None);
}
