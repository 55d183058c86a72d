//! Weapons, projectile hits and damage.
//!
//! [`fire_weapon`] is the single way anything shoots: the combat AI, player
//! auto-attack and tests all go through it, so the cooldown guard holds
//! everywhere. Hits are resolved by [`collision_system`] as circle overlaps
//! between projectiles and the ships or planets of the opposing side.

use serde::{Deserialize, Serialize};

use crate::components::{
    Health, Planet, Position, Projectile, Renderable, Spacecraft, SpacecraftType,
};
use crate::config::CombatTuning;
use crate::ecs::{EntityId, World};
use crate::math::Vec2;
use crate::tactics::{is_hostile_target, is_live_target};
use crate::targeting::{engagement_range, find_nearest_target};

// ============================================================================
// Combat Events
// ============================================================================

/// Events produced while resolving combat, for the audio and render layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A weapon fired.
    WeaponFired {
        /// Entity that fired.
        shooter: EntityId,
        /// The new projectile entity.
        projectile: EntityId,
        /// Muzzle position.
        position: Vec2,
    },
    /// A projectile struck something.
    ProjectileHit {
        /// The projectile entity (destroyed after resolution).
        projectile: EntityId,
        /// Entity that was hit.
        target: EntityId,
        /// Damage dealt.
        damage: i32,
        /// Side of the ship that fired the projectile.
        side: SpacecraftType,
    },
    /// A ship or planet was destroyed.
    Explosion {
        /// Entity that died.
        entity: EntityId,
        /// Where it died.
        position: Vec2,
    },
}

// ============================================================================
// Weapon Spawner
// ============================================================================

/// Fire `shooter`'s weapon at `target_pos`.
///
/// Does nothing while the weapon is cooling down. Otherwise turns the shooter
/// to face the point, spawns a projectile owned by the shooter and restarts
/// the cooldown. `target` of `None` makes the projectile hit any hostile in
/// its path.
///
/// Returns the projectile entity when a shot was fired.
pub fn fire_weapon(
    world: &mut World,
    shooter: EntityId,
    target: Option<EntityId>,
    target_pos: Vec2,
    combat: &CombatTuning,
) -> Option<EntityId> {
    let origin = world.get_component::<Position>(shooter)?.value;
    let craft = world.get_component_mut::<Spacecraft>(shooter)?;
    if !craft.can_fire() {
        return None;
    }

    let mut direction = origin.direction_to(target_pos);
    if direction.is_zero() {
        // Target point is under the muzzle: shoot along the current facing.
        direction = Vec2::from_heading_degrees(craft.angle);
    } else {
        craft.angle = direction.heading_degrees();
    }
    craft.weapon_cooldown = combat.weapon_cooldown;
    let side = craft.kind;

    let projectile = world.create_entity();
    world.add_component(projectile, Position::new(origin));
    world.add_component(
        projectile,
        Projectile {
            direction,
            speed: combat.projectile_speed,
            lifetime: combat.projectile_lifetime,
            owner: shooter,
            side,
            target,
            is_active: true,
        },
    );
    world.add_component(projectile, Renderable::PROJECTILE);

    tracing::debug!(shooter, projectile, ?target, "Weapon fired");
    Some(projectile)
}

/// Count weapon cooldowns down, never below zero.
pub fn update_weapon_cooldowns(world: &mut World, dt: f32) {
    world.for_each::<Spacecraft>(|_, craft| {
        craft.weapon_cooldown = (craft.weapon_cooldown - dt).max(0.0);
    });
}

// ============================================================================
// Player Auto-Attack
// ============================================================================

/// Let player ships shoot on their own.
///
/// A ship that is idle or under an attack order fires at its pursuit target
/// when that target is in engagement range, else at the nearest enemy ship
/// within firing range. Ships simply travelling hold fire.
pub fn player_auto_attack(world: &mut World, combat: &CombatTuning, events: &mut Vec<CombatEvent>) {
    for id in world.ids::<Spacecraft>() {
        let Some(craft) = world.get_component::<Spacecraft>(id).copied() else {
            continue;
        };
        if craft.kind != SpacecraftType::Player || !craft.can_fire() || !is_live_target(world, id) {
            continue;
        }
        if craft.is_moving && !craft.is_attacking {
            continue;
        }
        let Some(origin) = world.get_component::<Position>(id).map(|p| p.value) else {
            continue;
        };

        let pursued = craft.target_entity.filter(|&target| {
            is_hostile_target(world, craft.kind, target)
                && world
                    .get_component::<Position>(target)
                    .is_some_and(|p| origin.distance(p.value) <= engagement_range(world, target, combat))
        });
        let Some(target) = pursued.or_else(|| find_nearest_target(world, id, combat.firing_range))
        else {
            continue;
        };
        let Some(target_pos) = world.get_component::<Position>(target).map(|p| p.value) else {
            continue;
        };

        if let Some(projectile) = fire_weapon(world, id, Some(target), target_pos, combat) {
            events.push(CombatEvent::WeaponFired {
                shooter: id,
                projectile,
                position: origin,
            });
        }
    }
}

// ============================================================================
// Collision
// ============================================================================

/// What a projectile can hit at `point`, by the projectile's rules.
fn struck_entity(
    world: &World,
    projectile: &Projectile,
    point: Vec2,
    combat: &CombatTuning,
) -> Option<EntityId> {
    let overlaps = |id: EntityId| -> bool {
        let Some(position) = world.get_component::<Position>(id) else {
            return false;
        };
        let radius = world
            .get_component::<Planet>(id)
            .map_or(combat.ship_radius, |planet| planet.radius);
        point.distance(position.value) <= radius + combat.projectile_radius
    };

    if let Some(target) = projectile.target {
        return (is_hostile_target(world, projectile.side, target) && overlaps(target))
            .then_some(target);
    }

    let hits = |id: &EntityId| is_hostile_target(world, projectile.side, *id) && overlaps(*id);
    let ship = world.ids::<Spacecraft>().into_iter().find(hits);
    ship.or_else(|| world.ids::<Planet>().into_iter().find(hits))
}

/// Resolve projectile hits.
///
/// Each active projectile damages at most one entity. Spent projectiles are
/// destroyed once every hit has been resolved.
pub fn collision_system(world: &mut World, combat: &CombatTuning, events: &mut Vec<CombatEvent>) {
    let mut spent = Vec::new();

    for id in world.ids::<Projectile>() {
        let (Some(projectile), Some(point)) = (
            world.get_component::<Projectile>(id).copied(),
            world.get_component::<Position>(id).map(|p| p.value),
        ) else {
            continue;
        };
        if !projectile.is_active {
            continue;
        }
        let Some(victim) = struck_entity(world, &projectile, point, combat) else {
            continue;
        };

        let killed = world
            .get_component_mut::<Health>(victim)
            .is_some_and(|health| health.apply_damage(combat.projectile_damage));
        if let Some(p) = world.get_component_mut::<Projectile>(id) {
            p.is_active = false;
        }
        spent.push(id);
        events.push(CombatEvent::ProjectileHit {
            projectile: id,
            target: victim,
            damage: combat.projectile_damage,
            side: projectile.side,
        });

        if killed {
            on_destroyed(world, victim, events);
        }
    }

    for id in spent {
        world.destroy_entity(id);
    }
}

fn on_destroyed(world: &mut World, entity: EntityId, events: &mut Vec<CombatEvent>) {
    let position = world
        .get_component::<Position>(entity)
        .map_or(Vec2::ZERO, |p| p.value);
    events.push(CombatEvent::Explosion { entity, position });

    if let Some(planet) = world.get_component_mut::<Planet>(entity) {
        planet.build_queue.clear();
        let owner = planet.owner();
        world.add_component(entity, Renderable::DESTROYED_PLANET);
        tracing::info!(planet = entity, ?owner, "Planet destroyed");
    } else {
        tracing::debug!(ship = entity, "Ship destroyed");
    }
}
