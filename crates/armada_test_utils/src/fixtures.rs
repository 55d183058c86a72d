//! Test fixtures and helpers.
//!
//! Pre-built game states and entity configurations
//! for consistent testing.

use armada_core::components::{Health, Planet, Spacecraft, SpacecraftType};
use armada_core::config::SimConfig;
use armada_core::ecs::{EntityId, World};
use armada_core::math::Vec2;
use armada_core::simulation::Simulation;
use armada_core::systems::spawn_spacecraft;

/// Seed used by fixtures unless a test picks its own.
pub const DEFAULT_SEED: u64 = 0xA2_3ADA;

/// Config with enemy waves switched off, so scenarios only contain what
/// the test put there.
#[must_use]
pub fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.world.waves_enabled = false;
    config
}

/// Spawn a player ship into a bare world with default tuning.
pub fn spawn_player_ship(world: &mut World, x: f32, y: f32) -> EntityId {
    let tuning = SimConfig::default().world;
    spawn_spacecraft(world, SpacecraftType::Player, Vec2::new(x, y), &tuning)
}

/// Spawn an enemy ship into a bare world with default tuning.
pub fn spawn_enemy_ship(world: &mut World, x: f32, y: f32) -> EntityId {
    let tuning = SimConfig::default().world;
    spawn_spacecraft(world, SpacecraftType::Enemy, Vec2::new(x, y), &tuning)
}

/// Set a ship's or planet's current hit points. Zero or less kills it;
/// positive values never bring a dead entity back.
///
/// # Panics
///
/// Panics if the entity has no [`Health`] component.
pub fn set_hp(world: &mut World, entity: EntityId, hp: i32) {
    let health = world
        .get_component_mut::<Health>(entity)
        .expect("fixture entity has no Health");
    health.current_hp = hp;
    if hp <= 0 {
        health.is_alive = false;
    }
}

/// The opening layout: one planet per side, two player ships and one
/// enemy scout.
#[must_use]
pub fn skirmish(config: SimConfig, seed: u64) -> Simulation {
    let mut sim = Simulation::new(config, seed);
    sim.spawn_planet(Vec2::new(-0.5, 0.0), 0.15, true);
    sim.spawn_planet(Vec2::new(0.5, 0.3), 0.10, false);
    sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.0, -0.4));
    sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.2, 0.2));
    sim.spawn_ship(SpacecraftType::Enemy, Vec2::new(-0.3, 0.3));
    sim
}

/// [`skirmish`] with waves off and the default seed.
#[must_use]
pub fn quiet_skirmish() -> Simulation {
    skirmish(quiet_config(), DEFAULT_SEED)
}

/// Two columns of `per_side` ships facing each other, with a home planet
/// behind each column.
#[must_use]
pub fn battle_lines(per_side: usize, config: SimConfig, seed: u64) -> Simulation {
    let mut sim = Simulation::new(config, seed);
    sim.spawn_planet(Vec2::new(-0.6, 0.0), 0.15, true);
    sim.spawn_planet(Vec2::new(0.6, 0.0), 0.10, false);
    for i in 0..per_side {
        #[allow(clippy::cast_precision_loss)]
        let y = -0.5 + i as f32 / per_side.max(1) as f32;
        sim.spawn_ship(SpacecraftType::Player, Vec2::new(-0.35, y));
        sim.spawn_ship(SpacecraftType::Enemy, Vec2::new(0.35, y));
    }
    sim
}

/// Number of ships of `kind` still alive.
#[must_use]
pub fn alive_ships(world: &World, kind: SpacecraftType) -> usize {
    world
        .ids::<Spacecraft>()
        .into_iter()
        .filter(|&id| {
            world.get_component::<Spacecraft>(id).is_some_and(|s| s.kind == kind)
                && world
                    .get_component::<Health>(id)
                    .is_some_and(|h| h.is_alive)
        })
        .count()
}

/// Ids of all planets owned by the player (`true`) or the enemy (`false`).
#[must_use]
pub fn planets_of(world: &World, player_owned: bool) -> Vec<EntityId> {
    world
        .ids::<Planet>()
        .into_iter()
        .filter(|&id| {
            world
                .get_component::<Planet>(id)
                .is_some_and(|p| p.is_player_owned == player_owned)
        })
        .collect()
}
