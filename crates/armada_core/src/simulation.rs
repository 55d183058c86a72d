//! Core simulation loop.
//!
//! [`Simulation`] owns the [`World`], the tuning, the group coordinator, the
//! AI scheduler and the seeded RNG, and advances them in a fixed system
//! order each tick.
//!
//! # Determinism
//!
//! - Systems iterate entities in ascending id order
//! - All randomness comes from the seeded [`SimRng`]
//! - The same seed, setup and tick sequence always give the same
//!   [`state_hash`](Simulation::state_hash)
//!
//! # Example
//!
//! ```
//! use armada_core::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default(), 7);
//! sim.spawn_planet(Vec2::new(-0.5, 0.0), 0.15, true);
//! let ship = sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.0, -0.4));
//! sim.order_move(ship, Vec2::new(0.2, 0.0)).unwrap();
//!
//! let events = sim.tick();
//! assert!(events.combat.is_empty());
//! assert_eq!(sim.get_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::CombatAi;
use crate::combat::{collision_system, player_auto_attack, update_weapon_cooldowns, CombatEvent};
use crate::components::{
    BuildableUnit, Health, Planet, Position, Projectile, Renderable, Selectable, Spacecraft,
    SpacecraftType,
};
use crate::config::SimConfig;
use crate::ecs::{Component, EntityId, World};
use crate::error::{GameError, Result};
use crate::formation::GroupCoordinator;
use crate::math::{SimRng, Vec2};
use crate::systems::{
    check_outcome, cleanup_dead_ships, movement_system, planet_production_system,
    projectile_system, pursuit_system, spawn_spacecraft, Outcome, WaveSpawner,
};
use crate::tactics::is_hostile_target;

/// Ticks per second of the fixed-step [`Simulation::tick`].
pub const TICK_RATE: u32 = 60;

/// Seconds covered by one fixed step.
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Events generated during a simulation tick.
///
/// The audio and render layers consume these; the simulation never waits on
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Weapon fire, hits and explosions, in resolution order.
    pub combat: Vec<CombatEvent>,
    /// Ships destroyed at the end of the tick.
    pub deaths: Vec<EntityId>,
    /// Ships spawned this tick (planet builds and waves).
    pub spawned: Vec<EntityId>,
    /// Number of the wave that spawned this tick, if any.
    pub wave: Option<u32>,
    /// Projectiles that expired without hitting anything.
    pub expired_projectiles: usize,
}

/// The core game simulation.
///
/// # System Execution Order
///
/// 1. **Cooldowns** - weapons cool down
/// 2. **Group coordination** - formation bookkeeping, then new formations
/// 3. **Enemy AI** - batched state machine evaluation and execution
/// 4. **Player auto-attack**
/// 5. **Movement** - pursuit, steering, separation
/// 6. **Projectiles** - flight and expiry
/// 7. **Collision** - hits and damage
/// 8. **Planet production**
/// 9. **Enemy waves**
/// 10. **Cleanup** - dead ships are destroyed
/// 11. **Outcome**
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    tick: u64,
    elapsed: f32,
    world: World,
    config: SimConfig,
    coordinator: GroupCoordinator,
    ai: CombatAi,
    waves: WaveSpawner,
    rng: SimRng,
    outcome: Outcome,
}

impl Simulation {
    /// Create an empty simulation.
    #[must_use]
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            world: World::new(),
            waves: WaveSpawner::new(&config.world),
            coordinator: GroupCoordinator::new(),
            ai: CombatAi::new(),
            rng: SimRng::new(seed),
            outcome: Outcome::InProgress,
            config,
        }
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// The entity store.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable entity store, for input layers and test setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Active tuning.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The group coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &GroupCoordinator {
        &self.coordinator
    }

    /// The enemy wave timer.
    #[must_use]
    pub fn waves(&self) -> &WaveSpawner {
        &self.waves
    }

    /// Match outcome as of the last tick.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Spawn a ship for `kind` at `position`.
    pub fn spawn_ship(&mut self, kind: SpacecraftType, position: Vec2) -> EntityId {
        spawn_spacecraft(&mut self.world, kind, position, &self.config.world)
    }

    /// Spawn a planet.
    pub fn spawn_planet(&mut self, position: Vec2, radius: f32, is_player_owned: bool) -> EntityId {
        let id = self.world.create_entity();
        self.world.add_component(id, Position::new(position));
        self.world.add_component(id, Planet::new(radius, is_player_owned));
        self.world.add_component(id, Health::new(self.config.world.planet_hp));
        self.world.add_component(
            id,
            Selectable {
                is_selected: false,
                selection_radius: radius,
            },
        );
        self.world.add_component(id, Renderable::PLANET);
        id
    }

    fn spacecraft_mut(&mut self, ship: EntityId) -> Result<&mut Spacecraft> {
        if !self.world.exists(ship) {
            return Err(GameError::EntityNotFound(ship));
        }
        self.world
            .get_component_mut::<Spacecraft>(ship)
            .ok_or(GameError::MissingComponent {
                entity: ship,
                component: Spacecraft::NAME,
            })
    }

    /// Order a player ship to move.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities, non-ships and enemy ships (those belong
    /// to the AI).
    pub fn order_move(&mut self, ship: EntityId, destination: Vec2) -> Result<()> {
        let destination = self.config.world.bounds.clamp(destination);
        let craft = self.spacecraft_mut(ship)?;
        if craft.kind != SpacecraftType::Player {
            return Err(GameError::InvalidCommand {
                entity: ship,
                reason: "enemy ships are AI controlled",
            });
        }
        craft.target_entity = None;
        craft.is_attacking = false;
        craft.move_to(destination);
        Ok(())
    }

    /// Order a player ship to pursue and attack `target`.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities, non-ships and enemy ships. The target must
    /// exist and be an alive enemy ship or enemy planet.
    pub fn order_attack(&mut self, ship: EntityId, target: EntityId) -> Result<()> {
        if !self.world.exists(target) {
            return Err(GameError::EntityNotFound(target));
        }
        let hostile = is_hostile_target(&self.world, SpacecraftType::Player, target);
        let craft = self.spacecraft_mut(ship)?;
        if craft.kind != SpacecraftType::Player {
            return Err(GameError::InvalidCommand {
                entity: ship,
                reason: "enemy ships are AI controlled",
            });
        }
        if !hostile {
            return Err(GameError::InvalidCommand {
                entity: target,
                reason: "target is not an alive enemy",
            });
        }
        craft.target_entity = Some(target);
        craft.is_attacking = true;
        Ok(())
    }

    /// Queue a spacecraft build on a planet.
    ///
    /// # Errors
    ///
    /// Fails for unknown entities, non-planets and destroyed planets.
    pub fn queue_build(&mut self, planet: EntityId) -> Result<()> {
        if !self.world.exists(planet) {
            return Err(GameError::EntityNotFound(planet));
        }
        let alive = self
            .world
            .get_component::<Health>(planet)
            .map_or(true, |h| h.is_alive);
        let build_time = self.config.world.spacecraft_build_time;
        let record = self
            .world
            .get_component_mut::<Planet>(planet)
            .ok_or(GameError::MissingComponent {
                entity: planet,
                component: Planet::NAME,
            })?;
        if !alive {
            return Err(GameError::InvalidCommand {
                entity: planet,
                reason: "planet is destroyed",
            });
        }
        record.enqueue(BuildableUnit::Spacecraft, build_time);
        Ok(())
    }

    /// Advance one fixed step of [`TICK_DT`] seconds.
    pub fn tick(&mut self) -> TickEvents {
        self.step(TICK_DT)
    }

    /// Advance by a measured `dt` seconds.
    pub fn step(&mut self, dt: f32) -> TickEvents {
        let mut events = TickEvents::default();
        let config = &self.config;

        // 1. Cooldowns
        update_weapon_cooldowns(&mut self.world, dt);

        // 2. Group coordination runs before unit AI reads formations
        self.coordinator.update(&mut self.world, dt, config);

        // 3. Enemy AI
        self.ai
            .update(&mut self.world, &self.coordinator, dt, config, &mut events.combat);

        // 4. Player auto-attack
        player_auto_attack(&mut self.world, &config.combat, &mut events.combat);

        // 5. Movement
        pursuit_system(&mut self.world, config);
        movement_system(&mut self.world, dt, &config.world, &mut self.rng);

        // 6-7. Projectiles and hits
        events.expired_projectiles = projectile_system(&mut self.world, dt);
        collision_system(&mut self.world, &config.combat, &mut events.combat);

        // 8. Planet production
        events.spawned =
            planet_production_system(&mut self.world, dt, &config.world, &mut self.rng);

        // 9. Enemy waves
        let wave = self
            .waves
            .update(&mut self.world, dt, &config.world, &mut self.rng);
        if !wave.is_empty() {
            events.wave = Some(self.waves.wave());
            events.spawned.extend(wave);
        }

        // 10. Cleanup
        events.deaths = cleanup_dead_ships(&mut self.world);

        // 11. Outcome
        let outcome = check_outcome(&self.world);
        if outcome != self.outcome {
            if outcome == Outcome::Defeat {
                tracing::info!(tick = self.tick, elapsed = self.elapsed, "All player planets lost");
            }
            self.outcome = outcome;
        }

        self.tick += 1;
        self.elapsed += dt;
        events
    }

    /// Hash of the full simulation state, for determinism checks.
    ///
    /// Floats are hashed by bit pattern, entities in ascending id order.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.rng.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.world.entity_count().hash(&mut hasher);

        let hash_vec = |v: Vec2, hasher: &mut DefaultHasher| {
            v.x.to_bits().hash(hasher);
            v.y.to_bits().hash(hasher);
        };

        for (id, position) in sorted::<Position>(&self.world) {
            id.hash(&mut hasher);
            hash_vec(position.value, &mut hasher);
        }
        for (id, health) in sorted::<Health>(&self.world) {
            id.hash(&mut hasher);
            health.hash(&mut hasher);
        }
        for (id, craft) in sorted::<Spacecraft>(&self.world) {
            id.hash(&mut hasher);
            craft.kind.hash(&mut hasher);
            craft.ai_state.hash(&mut hasher);
            craft.ai_target.hash(&mut hasher);
            craft.target_entity.hash(&mut hasher);
            craft.is_moving.hash(&mut hasher);
            craft.angle.to_bits().hash(&mut hasher);
            craft.weapon_cooldown.to_bits().hash(&mut hasher);
            hash_vec(craft.destination, &mut hasher);
        }
        for (id, planet) in sorted::<Planet>(&self.world) {
            id.hash(&mut hasher);
            planet.is_player_owned.hash(&mut hasher);
            planet.build_queue.len().hash(&mut hasher);
            for entry in &planet.build_queue {
                entry.time_remaining.to_bits().hash(&mut hasher);
            }
        }
        for (id, projectile) in sorted::<Projectile>(&self.world) {
            id.hash(&mut hasher);
            projectile.owner.hash(&mut hasher);
            projectile.target.hash(&mut hasher);
            projectile.lifetime.to_bits().hash(&mut hasher);
            hash_vec(projectile.direction, &mut hasher);
        }
        for formation in self.coordinator.formations() {
            formation.members.hash(&mut hasher);
            formation.target.hash(&mut hasher);
            formation.age.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the simulation state for snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a simulation from [`serialize`](Self::serialize) output.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid snapshot.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default(), 0)
    }
}

/// Table rows sorted by entity id.
fn sorted<T: Component>(world: &World) -> Vec<(EntityId, &T)> {
    let mut rows: Vec<_> = world.iter::<T>().collect();
    rows.sort_unstable_by_key(|(id, _)| *id);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AiState;
    use crate::formation::FormationKind;

    fn quiet_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.world.waves_enabled = false;
        config
    }

    fn skirmish(seed: u64) -> Simulation {
        let mut sim = Simulation::new(quiet_config(), seed);
        sim.spawn_planet(Vec2::new(-0.5, 0.0), 0.15, true);
        sim.spawn_planet(Vec2::new(0.5, 0.3), 0.10, false);
        sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.0, -0.4));
        sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.2, 0.2));
        for i in 0..5 {
            sim.spawn_ship(SpacecraftType::Enemy, Vec2::new(-0.3 + 0.05 * i as f32, 0.3));
        }
        sim
    }

    #[test]
    fn test_simulation_new() {
        let sim = Simulation::default();
        assert_eq!(sim.get_tick(), 0);
        assert_eq!(sim.world().entity_count(), 0);
        assert_eq!(sim.outcome(), Outcome::InProgress);
    }

    #[test]
    fn test_tick_advances_time() {
        let mut sim = skirmish(1);
        sim.tick();
        sim.step(0.05);
        assert_eq!(sim.get_tick(), 2);
        assert!((sim.elapsed() - (TICK_DT + 0.05)).abs() < 1e-6);
    }

    #[test]
    fn test_enemies_form_up_and_fight() {
        let mut sim = skirmish(1);
        sim.tick();

        let formations = sim.coordinator().formations();
        assert_eq!(formations.len(), 1);
        assert_eq!(formations[0].kind, FormationKind::MassAttack);
        assert_eq!(formations[0].members.len(), 5);

        let mut fired = false;
        for _ in 0..600 {
            let events = sim.tick();
            fired |= events
                .combat
                .iter()
                .any(|e| matches!(e, CombatEvent::WeaponFired { .. }));
        }
        assert!(fired);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let mut a = skirmish(42);
        let mut b = skirmish(42);
        for _ in 0..300 {
            a.tick();
            b.tick();
            assert_eq!(a.state_hash(), b.state_hash());
        }
    }

    #[test]
    fn test_snapshot_roundtrip_resumes_identically() {
        let mut sim = skirmish(3);
        for _ in 0..120 {
            sim.tick();
        }
        let bytes = sim.serialize().unwrap();
        let mut restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), sim.state_hash());

        for _ in 0..120 {
            sim.tick();
            restored.tick();
        }
        assert_eq!(restored.state_hash(), sim.state_hash());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        assert!(matches!(
            Simulation::deserialize(&[1, 2, 3]),
            Err(GameError::Snapshot(_))
        ));
    }

    #[test]
    fn test_order_move_rejects_enemy_ships() {
        let mut sim = skirmish(1);
        let enemy = sim.world().ids::<Spacecraft>().into_iter().last().unwrap();
        assert!(matches!(
            sim.order_move(enemy, Vec2::ZERO),
            Err(GameError::InvalidCommand { .. })
        ));
        assert!(matches!(
            sim.order_move(999, Vec2::ZERO),
            Err(GameError::EntityNotFound(999))
        ));
    }

    #[test]
    fn test_order_move_clamps_destination() {
        let mut sim = skirmish(1);
        let player = sim.spawn_ship(SpacecraftType::Player, Vec2::ZERO);
        sim.order_move(player, Vec2::new(5.0, 0.0)).unwrap();
        let craft = sim.world().get_component::<Spacecraft>(player).unwrap();
        assert!((craft.destination.x - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_queue_build_spawns_after_build_time() {
        let mut sim = Simulation::new(quiet_config(), 0);
        let home = sim.spawn_planet(Vec2::ZERO, 0.15, true);
        sim.queue_build(home).unwrap();

        let mut spawned = Vec::new();
        for _ in 0..(5 * TICK_RATE + 5) {
            spawned.extend(sim.tick().spawned);
        }
        assert_eq!(spawned.len(), 1);
        let craft = sim.world().get_component::<Spacecraft>(spawned[0]).unwrap();
        assert_eq!(craft.kind, SpacecraftType::Player);

        let ship = spawned[0];
        assert!(matches!(
            sim.queue_build(ship),
            Err(GameError::MissingComponent { component: "Planet", .. })
        ));
    }

    #[test]
    fn test_defeat_when_last_player_planet_falls() {
        let mut sim = Simulation::new(quiet_config(), 0);
        let home = sim.spawn_planet(Vec2::ZERO, 0.15, true);
        sim.tick();
        assert_eq!(sim.outcome(), Outcome::InProgress);

        sim.world_mut()
            .get_component_mut::<Health>(home)
            .unwrap()
            .apply_damage(1000);
        sim.tick();
        assert_eq!(sim.outcome(), Outcome::Defeat);
    }

    #[test]
    fn test_waves_arrive_when_enabled() {
        let mut config = SimConfig::default();
        config.world.initial_wave_interval = 0.5;
        let mut sim = Simulation::new(config, 5);
        sim.spawn_planet(Vec2::ZERO, 0.15, true);

        let mut waves = Vec::new();
        for _ in 0..TICK_RATE {
            if let Some(wave) = sim.tick().wave {
                waves.push(wave);
            }
        }
        assert_eq!(waves, vec![1]);
        assert_eq!(sim.world().count::<Spacecraft>(), 1);
    }

    #[test]
    fn test_dead_enemy_removed_same_tick() {
        let mut sim = skirmish(1);
        let enemy = sim.world().ids::<Spacecraft>().into_iter().last().unwrap();
        sim.world_mut()
            .get_component_mut::<Health>(enemy)
            .unwrap()
            .apply_damage(100);
        let events = sim.tick();
        assert!(events.deaths.contains(&enemy));
        assert!(!sim.world().exists(enemy));
        assert!(sim.coordinator().active_formation(enemy).is_none());
    }

    #[test]
    fn test_retreating_enemy_state_is_tinted() {
        let mut sim = Simulation::new(quiet_config(), 0);
        sim.spawn_planet(Vec2::new(-0.5, 0.0), 0.15, true);
        let enemy = sim.spawn_ship(SpacecraftType::Enemy, Vec2::ZERO);
        sim.world_mut().add_component(enemy, Health::with_current(1, 10));
        sim.spawn_ship(SpacecraftType::Player, Vec2::new(0.3, 0.0));

        sim.tick();
        let craft = sim.world().get_component::<Spacecraft>(enemy).unwrap();
        assert_eq!(craft.ai_state, AiState::Retreat);
        assert_eq!(
            sim.world().get_component::<Renderable>(enemy),
            Some(&Renderable::for_ai_state(AiState::Retreat))
        );
    }
}
