//! Whole-simulation tests: orders, production, outcome and snapshots.

use armada_core::prelude::*;
use armada_test_utils::determinism::{find_first_divergence, replay, snapshot_resumes_in_lockstep};
use armada_test_utils::fixtures::{
    alive_ships, battle_lines, planets_of, quiet_config, quiet_skirmish, set_hp, skirmish,
    DEFAULT_SEED,
};

fn ships_of(sim: &Simulation, kind: SpacecraftType) -> Vec<EntityId> {
    sim.world()
        .ids::<Spacecraft>()
        .into_iter()
        .filter(|&id| sim.world().get_component::<Spacecraft>(id).unwrap().kind == kind)
        .collect()
}

#[test]
fn test_queued_build_spawns_a_player_ship() {
    let mut sim = quiet_skirmish();
    let home = planets_of(sim.world(), true)[0];
    sim.queue_build(home).unwrap();

    let mut spawned = Vec::new();
    for _ in 0..320 {
        spawned.extend(sim.tick().spawned);
    }

    assert_eq!(spawned.len(), 1);
    let craft = sim.world().get_component::<Spacecraft>(spawned[0]).unwrap();
    assert_eq!(craft.kind, SpacecraftType::Player);
    let planet = sim.world().get_component::<Planet>(home).unwrap();
    assert!(planet.build_queue.is_empty());
}

#[test]
fn test_orders_are_validated() {
    let mut sim = quiet_skirmish();
    let enemy = ships_of(&sim, SpacecraftType::Enemy)[0];
    let home = planets_of(sim.world(), true)[0];

    assert!(matches!(
        sim.order_move(enemy, Vec2::ZERO),
        Err(GameError::InvalidCommand { .. })
    ));
    assert!(matches!(
        sim.order_move(999, Vec2::ZERO),
        Err(GameError::EntityNotFound(999))
    ));
    assert!(matches!(
        sim.queue_build(enemy),
        Err(GameError::MissingComponent { component: "Planet", .. })
    ));

    set_hp(sim.world_mut(), home, 0);
    assert!(matches!(
        sim.queue_build(home),
        Err(GameError::InvalidCommand { .. })
    ));
}

#[test]
fn test_attack_orders_need_a_live_enemy() {
    let mut sim = quiet_skirmish();
    let players = ships_of(&sim, SpacecraftType::Player);
    let enemy = ships_of(&sim, SpacecraftType::Enemy)[0];
    let home = planets_of(sim.world(), true)[0];
    let hostile_planet = planets_of(sim.world(), false)[0];

    assert!(matches!(
        sim.order_attack(players[0], players[1]),
        Err(GameError::InvalidCommand { .. })
    ));
    assert!(matches!(
        sim.order_attack(players[0], home),
        Err(GameError::InvalidCommand { .. })
    ));
    let craft = sim.world().get_component::<Spacecraft>(players[0]).unwrap();
    assert_eq!(craft.target_entity, None);
    assert!(!craft.is_attacking);

    sim.order_attack(players[0], hostile_planet).unwrap();
    sim.order_attack(players[0], enemy).unwrap();
    assert_eq!(
        sim.world().get_component::<Spacecraft>(players[0]).unwrap().target_entity,
        Some(enemy)
    );

    set_hp(sim.world_mut(), enemy, 0);
    assert!(matches!(
        sim.order_attack(players[1], enemy),
        Err(GameError::InvalidCommand { .. })
    ));
}

#[test]
fn test_rejected_attack_order_leaves_friends_unharmed() {
    let mut sim = Simulation::new(quiet_config(), DEFAULT_SEED);
    let home = sim.spawn_planet(Vec2::new(-0.5, 0.0), 0.15, true);
    let shooter = sim.spawn_ship(SpacecraftType::Player, Vec2::ZERO);
    let wingman = sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.3, 0.0));

    assert!(sim.order_attack(shooter, wingman).is_err());
    assert!(sim.order_attack(shooter, home).is_err());
    for _ in 0..600 {
        sim.tick();
    }

    for id in [wingman, home] {
        let health = sim.world().get_component::<Health>(id).unwrap();
        assert_eq!(health.current_hp, health.max_hp);
    }
    assert_eq!(sim.world().count::<Projectile>(), 0);
}

#[test]
fn test_move_orders_are_clamped_to_the_field() {
    let mut sim = quiet_skirmish();
    let ship = sim.world().ids::<Spacecraft>()[0];
    sim.order_move(ship, Vec2::new(5.0, -5.0)).unwrap();

    let craft = sim.world().get_component::<Spacecraft>(ship).unwrap();
    assert!(craft.is_moving);
    assert!((craft.destination.x - 0.95).abs() < 1e-6);
    assert!((craft.destination.y + 0.70).abs() < 1e-6);
}

#[test]
fn test_losing_every_player_planet_is_defeat() {
    let mut sim = quiet_skirmish();
    sim.tick();
    assert_eq!(sim.outcome(), Outcome::InProgress);

    for planet in planets_of(sim.world(), true) {
        set_hp(sim.world_mut(), planet, 0);
    }
    sim.tick();
    assert_eq!(sim.outcome(), Outcome::Defeat);
}

#[test]
fn test_waves_arrive_on_schedule() {
    let mut config = SimConfig::default();
    config.world.initial_wave_interval = 1.0;
    let mut sim = skirmish(config, DEFAULT_SEED);
    let before = alive_ships(sim.world(), SpacecraftType::Enemy);

    let mut first_wave = None;
    for _ in 0..75 {
        let events = sim.tick();
        if events.wave.is_some() {
            first_wave = Some(events);
            break;
        }
    }

    let events = first_wave.expect("a wave within 75 ticks");
    assert_eq!(events.wave, Some(1));
    assert_eq!(events.spawned.len(), 1);
    assert_eq!(sim.waves().wave(), 1);
    assert!(alive_ships(sim.world(), SpacecraftType::Enemy) > before);
}

#[test]
fn test_skirmish_replays_identically() {
    replay(|| skirmish(SimConfig::default(), 17), 2, 900).assert_replays_match();
}

#[test]
fn test_battle_never_diverges() {
    assert_eq!(
        find_first_divergence(|| battle_lines(8, SimConfig::default(), 3), 300),
        None
    );
}

#[test]
fn test_snapshot_mid_battle_resumes_identically() {
    assert!(snapshot_resumes_in_lockstep(
        || battle_lines(6, SimConfig::default(), DEFAULT_SEED),
        180
    ));
}

#[test]
fn test_snapshot_keeps_tick_and_outcome() {
    let mut sim = quiet_skirmish();
    for _ in 0..42 {
        sim.tick();
    }
    let bytes = sim.serialize().unwrap();
    let restored = Simulation::deserialize(&bytes).unwrap();

    assert_eq!(restored.get_tick(), 42);
    assert_eq!(restored.outcome(), sim.outcome());
    assert_eq!(restored.state_hash(), sim.state_hash());
}

#[test]
fn test_garbage_snapshot_is_rejected() {
    assert!(matches!(
        Simulation::deserialize(&[1, 2, 3]),
        Err(GameError::Snapshot(_))
    ));
}
