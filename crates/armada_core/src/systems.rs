//! Simulation systems.
//!
//! The collaborators around the combat AI: movement, projectile flight,
//! planet production, enemy waves and removal of the dead. Each system reads
//! and writes the [`World`] directly and never creates or destroys entities
//! while iterating a table; ids are collected first and mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::components::{
    BuildableUnit, Health, Planet, Position, Projectile, Renderable, Selectable, Spacecraft,
    SpacecraftType,
};
use crate::config::{SimConfig, WorldTuning};
use crate::ecs::{EntityId, World};
use crate::math::{SimRng, Vec2};
use crate::tactics::is_live_target;

/// Spawn a fully equipped spacecraft.
pub fn spawn_spacecraft(
    world: &mut World,
    kind: SpacecraftType,
    position: Vec2,
    tuning: &WorldTuning,
) -> EntityId {
    let id = world.create_entity();
    world.add_component(id, Position::new(position));
    world.add_component(id, Spacecraft::new(kind));
    world.add_component(id, Health::new(tuning.spacecraft_hp));
    world.add_component(id, Selectable::default());
    let tint = match kind {
        SpacecraftType::Player => Renderable::PLAYER_SHIP,
        SpacecraftType::Enemy => Renderable::ENEMY_SHIP,
    };
    world.add_component(id, tint);
    id
}

// ============================================================================
// Movement
// ============================================================================

/// Point player ships with a pursuit target at that target.
///
/// Ships stop once the target is within firing range; a dead or vanished
/// target cancels the pursuit.
pub fn pursuit_system(world: &mut World, config: &SimConfig) {
    for id in world.ids::<Spacecraft>() {
        let Some(craft) = world.get_component::<Spacecraft>(id).copied() else {
            continue;
        };
        let Some(target) = craft.target_entity else {
            continue;
        };
        let (Some(origin), Some(target_pos)) = (
            world.get_component::<Position>(id).map(|p| p.value),
            world.get_component::<Position>(target).map(|p| p.value),
        ) else {
            if let Some(craft) = world.get_component_mut::<Spacecraft>(id) {
                craft.target_entity = None;
                craft.is_attacking = false;
            }
            continue;
        };
        let live = is_live_target(world, target);

        let Some(craft) = world.get_component_mut::<Spacecraft>(id) else {
            continue;
        };
        if !live {
            craft.target_entity = None;
            craft.is_attacking = false;
        } else if origin.distance(target_pos) <= config.combat.firing_range {
            craft.stop();
        } else {
            craft.move_to(target_pos);
        }
    }
}

/// Move ships toward their destinations, then push overlapping same-side
/// ships apart.
///
/// Exactly overlapping ships are split along a direction drawn from `rng`.
pub fn movement_system(world: &mut World, dt: f32, tuning: &WorldTuning, rng: &mut SimRng) {
    let ids = world.ids::<Spacecraft>();

    for &id in &ids {
        let alive = world.get_component::<Health>(id).map_or(true, |h| h.is_alive);
        if !alive {
            continue;
        }
        let Some(origin) = world.get_component::<Position>(id).map(|p| p.value) else {
            continue;
        };
        let Some(craft) = world.get_component_mut::<Spacecraft>(id) else {
            continue;
        };
        if !craft.is_moving {
            continue;
        }

        let to_destination = craft.destination - origin;
        let distance = to_destination.length();
        let next = if distance <= tuning.arrival_threshold {
            craft.stop();
            origin
        } else {
            craft.angle = to_destination.heading_degrees();
            let step = (tuning.ship_speed * dt).min(distance);
            origin + to_destination.normalize_or_zero() * step
        };
        if let Some(position) = world.get_component_mut::<Position>(id) {
            position.value = next;
        }
    }

    separate(world, &ids, tuning, rng);
}

fn separate(world: &mut World, ids: &[EntityId], tuning: &WorldTuning, rng: &mut SimRng) {
    let ships: Vec<(EntityId, Vec2, SpacecraftType)> = ids
        .iter()
        .filter(|&&id| is_live_target(world, id))
        .filter_map(|&id| {
            let position = world.get_component::<Position>(id)?.value;
            let kind = world.get_component::<Spacecraft>(id)?.kind;
            Some((id, position, kind))
        })
        .collect();

    let mut pushes = vec![Vec2::ZERO; ships.len()];
    for i in 0..ships.len() {
        for j in (i + 1)..ships.len() {
            let (_, a, kind_a) = ships[i];
            let (_, b, kind_b) = ships[j];
            if kind_a != kind_b {
                continue;
            }
            let distance = a.distance(b);
            if distance >= tuning.separation_radius {
                continue;
            }
            let mut direction = b.direction_to(a);
            if direction.is_zero() {
                direction = rng.next_direction();
            }
            let push = direction * ((tuning.separation_radius - distance) * tuning.separation_strength * 0.5);
            pushes[i] = pushes[i] + push;
            pushes[j] = pushes[j] - push;
        }
    }

    for ((id, _, _), push) in ships.into_iter().zip(pushes) {
        if push.is_zero() {
            continue;
        }
        if let Some(position) = world.get_component_mut::<Position>(id) {
            position.value = position.value + push;
        }
    }
}

// ============================================================================
// Projectiles
// ============================================================================

/// Fly projectiles and destroy the ones whose lifetime ran out.
///
/// Returns the number of expired projectiles.
pub fn projectile_system(world: &mut World, dt: f32) -> usize {
    let mut expired = Vec::new();

    for id in world.ids::<Projectile>() {
        let Some(projectile) = world.get_component_mut::<Projectile>(id) else {
            continue;
        };
        projectile.lifetime -= dt;
        let velocity = projectile.direction * (projectile.speed * dt);
        if projectile.lifetime <= 0.0 {
            projectile.is_active = false;
            expired.push(id);
            continue;
        }
        if let Some(position) = world.get_component_mut::<Position>(id) {
            position.value = position.value + velocity;
        }
    }

    for &id in &expired {
        tracing::debug!(projectile = id, "Projectile expired");
        world.destroy_entity(id);
    }
    expired.len()
}

// ============================================================================
// Planet Production
// ============================================================================

/// Advance every alive planet's build queue and launch finished ships.
///
/// Returns the spawned ship ids.
pub fn planet_production_system(
    world: &mut World,
    dt: f32,
    tuning: &WorldTuning,
    rng: &mut SimRng,
) -> Vec<EntityId> {
    let mut finished = Vec::new();

    for id in world.ids::<Planet>() {
        let alive = is_live_target(world, id);
        let Some(planet) = world.get_component_mut::<Planet>(id) else {
            continue;
        };
        if !alive {
            planet.build_queue.clear();
            continue;
        }
        let Some(head) = planet.build_queue.front_mut() else {
            continue;
        };
        head.time_remaining -= dt;
        if head.time_remaining <= 0.0 {
            if let Some(entry) = planet.build_queue.pop_front() {
                finished.push((id, entry.unit, planet.owner(), planet.radius));
            }
        }
    }

    let mut spawned = Vec::new();
    for (planet, unit, owner, radius) in finished {
        let Some(center) = world.get_component::<Position>(planet).map(|p| p.value) else {
            continue;
        };
        let position = tuning
            .bounds
            .clamp(center.offset_polar(rng.next_angle(), radius + tuning.separation_radius));
        let ship = match unit {
            BuildableUnit::Spacecraft => spawn_spacecraft(world, owner, position, tuning),
        };
        tracing::info!(planet, ship, ?owner, "Planet finished a build");
        spawned.push(ship);
    }
    spawned
}

// ============================================================================
// Enemy Waves
// ============================================================================

/// Timer for enemy reinforcement waves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSpawner {
    timer: f32,
    interval: f32,
    wave: u32,
}

impl WaveSpawner {
    /// Create a spawner whose first wave arrives after the initial interval.
    #[must_use]
    pub fn new(tuning: &WorldTuning) -> Self {
        Self {
            timer: tuning.initial_wave_interval,
            interval: tuning.initial_wave_interval,
            wave: 0,
        }
    }

    /// Waves spawned so far.
    #[must_use]
    pub fn wave(&self) -> u32 {
        self.wave
    }

    /// Current interval between waves.
    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Number of ships in the wave with 0-based `index`.
    #[must_use]
    pub fn wave_size(index: u32) -> u32 {
        1 + index / 3
    }

    /// Advance the timer; spawns a wave just outside the field when it expires.
    ///
    /// Returns the spawned ship ids (empty when no wave spawned).
    pub fn update(
        &mut self,
        world: &mut World,
        dt: f32,
        tuning: &WorldTuning,
        rng: &mut SimRng,
    ) -> Vec<EntityId> {
        if !tuning.waves_enabled {
            return Vec::new();
        }
        self.timer -= dt;
        if self.timer > 0.0 {
            return Vec::new();
        }

        let count = Self::wave_size(self.wave);
        self.wave += 1;
        let reach = tuning.bounds.half_extents + Vec2::new(tuning.spawn_margin, tuning.spawn_margin);
        let ships: Vec<_> = (0..count)
            .map(|_| {
                let direction = rng.next_direction();
                // Scale onto the edge of the spawn rectangle.
                let scale_to = |extent: f32, component: f32| {
                    if component.abs() > f32::EPSILON {
                        extent / component.abs()
                    } else {
                        f32::INFINITY
                    }
                };
                let scale = scale_to(reach.x, direction.x).min(scale_to(reach.y, direction.y));
                spawn_spacecraft(world, SpacecraftType::Enemy, direction * scale, tuning)
            })
            .collect();

        self.interval = (self.interval * tuning.wave_interval_decay).max(tuning.min_wave_interval);
        self.timer = self.interval;
        tracing::info!(wave = self.wave, ships = count, next_in = self.interval, "Enemy wave spawned");
        ships
    }
}

// ============================================================================
// Cleanup & Outcome
// ============================================================================

/// Destroy dead spacecraft. Returns the destroyed ids.
pub fn cleanup_dead_ships(world: &mut World) -> Vec<EntityId> {
    let dead: Vec<_> = world
        .ids::<Spacecraft>()
        .into_iter()
        .filter(|&id| {
            world
                .get_component::<Health>(id)
                .is_some_and(|health| !health.is_alive)
        })
        .collect();
    for &id in &dead {
        world.destroy_entity(id);
    }
    dead
}

/// State of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Outcome {
    /// Still being fought.
    #[default]
    InProgress,
    /// Every player planet has fallen.
    Defeat,
}

/// Defeat once no alive player-owned planet remains.
#[must_use]
pub fn check_outcome(world: &World) -> Outcome {
    let holding = world.ids::<Planet>().into_iter().any(|id| {
        world
            .get_component::<Planet>(id)
            .is_some_and(|planet| planet.is_player_owned)
            && is_live_target(world, id)
    });
    if holding {
        Outcome::InProgress
    } else {
        Outcome::Defeat
    }
}
