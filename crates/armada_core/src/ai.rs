//! Unit combat AI.
//!
//! Every alive enemy ship runs a five-state machine:
//!
//! | State    | Entered when                                   |
//! |----------|------------------------------------------------|
//! | Retreat  | badly hurt and outnumbered                     |
//! | Regroup  | no other ship of either side on the map        |
//! | Engage   | a target is within engagement range            |
//! | Approach | a target exists anywhere                       |
//! | Search   | otherwise                                      |
//!
//! Rows are checked top to bottom and the first match wins, so Retreat
//! always beats Engage. [`decide_state`] is the pure transition function;
//! [`CombatAi`] batches evaluation of all units on a fixed cadence and then
//! executes each unit's state, which writes destinations, facing and
//! weapon fire.
//!
//! Formation membership (see [`crate::formation`]) takes precedence over
//! free movement while approaching or engaging.

use serde::{Deserialize, Serialize};

use crate::combat::{fire_weapon, CombatEvent};
use crate::components::{AiState, Health, Planet, Position, Renderable, Spacecraft, SpacecraftType};
use crate::config::{AiTuning, SimConfig};
use crate::ecs::{EntityId, World};
use crate::formation::{GroupCoordinator, GroupFormation};
use crate::math::Vec2;
use crate::tactics::{alive_ships, analyze, is_live_target, ShipView, TacticalInfo};
use crate::targeting::{find_nearest_planet, find_nearest_target, select_best_target};

/// Pure state transition.
///
/// `has_engage_target` is whether a target exists within engagement range,
/// `has_any_target` whether one exists at all.
#[must_use]
pub fn decide_state(
    health_fraction: f32,
    info: &TacticalInfo,
    has_engage_target: bool,
    has_any_target: bool,
    tuning: &AiTuning,
) -> AiState {
    if health_fraction < tuning.retreat_health_fraction && info.outnumbered() {
        AiState::Retreat
    } else if info.isolated() {
        AiState::Regroup
    } else if has_engage_target {
        AiState::Engage
    } else if has_any_target {
        AiState::Approach
    } else {
        AiState::Search
    }
}

/// Evaluate the state machine for one unit without changing anything.
///
/// Returns `None` for entities that are not alive spacecraft.
#[must_use]
pub fn update_ai_state_machine(
    world: &World,
    unit: EntityId,
    formation: Option<&GroupFormation>,
    config: &SimConfig,
) -> Option<(AiState, TacticalInfo)> {
    let health = world.get_component::<Health>(unit)?;
    if !health.is_alive {
        return None;
    }
    let info = analyze(world, unit, &config.ai)?;
    let engage = select_best_target(world, unit, formation, true, &config.combat);
    let any = engage.or_else(|| select_best_target(world, unit, formation, false, &config.combat));

    let state = decide_state(health.fraction(), &info, engage.is_some(), any.is_some(), &config.ai);
    Some((state, info))
}

/// Switch `unit` to `state`.
///
/// On an actual change the in-state timer restarts and enemy ships are
/// re-tinted so the renderer shows intent. Returns whether the state changed.
pub fn set_ai_state(world: &mut World, unit: EntityId, state: AiState) -> bool {
    let Some(craft) = world.get_component_mut::<Spacecraft>(unit) else {
        return false;
    };
    if craft.ai_state == state {
        return false;
    }
    let previous = craft.ai_state;
    craft.ai_state = state;
    craft.time_in_state = 0.0;
    let kind = craft.kind;

    if kind == SpacecraftType::Enemy && world.has_component::<Renderable>(unit) {
        world.add_component(unit, Renderable::for_ai_state(state));
    }
    tracing::debug!(unit, from = previous.name(), to = state.name(), "AI state changed");
    true
}

/// Batched scheduler for the enemy state machines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatAi {
    update_timer: f32,
}

impl CombatAi {
    /// Create a scheduler that evaluates on its first update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the timer and, when it expires, evaluate and execute every
    /// alive enemy unit in ascending id order.
    ///
    /// `coordinator` must already have done this tick's bookkeeping, so no
    /// unit follows a formation that was just dissolved. Returns whether
    /// units were evaluated.
    pub fn update(
        &mut self,
        world: &mut World,
        coordinator: &GroupCoordinator,
        dt: f32,
        config: &SimConfig,
        events: &mut Vec<CombatEvent>,
    ) -> bool {
        world.for_each::<Spacecraft>(|_, craft| {
            if craft.kind == SpacecraftType::Enemy {
                craft.time_in_state += dt;
            }
        });

        self.update_timer -= dt;
        if self.update_timer > 0.0 {
            return false;
        }
        self.update_timer = config.ai.update_interval;

        for unit in world.ids::<Spacecraft>() {
            let is_enemy = world
                .get_component::<Spacecraft>(unit)
                .is_some_and(|craft| craft.kind == SpacecraftType::Enemy);
            if !is_enemy {
                continue;
            }
            let formation = coordinator.active_formation(unit);
            let Some((state, info)) = update_ai_state_machine(world, unit, formation, config) else {
                continue;
            };
            set_ai_state(world, unit, state);
            execute_state(world, unit, state, &info, formation, config, events);
        }
        true
    }
}

/// Run the behavior of `state` for one unit.
pub fn execute_state(
    world: &mut World,
    unit: EntityId,
    state: AiState,
    info: &TacticalInfo,
    formation: Option<&GroupFormation>,
    config: &SimConfig,
    events: &mut Vec<CombatEvent>,
) {
    match state {
        AiState::Search => execute_search(world, unit, config),
        AiState::Approach => execute_approach(world, unit, formation, config),
        AiState::Engage => execute_engage(world, unit, info, formation, config, events),
        AiState::Retreat => execute_retreat(world, unit, config),
        AiState::Regroup => execute_regroup(world, unit, config),
    }
}

fn position_of(world: &World, id: EntityId) -> Option<Vec2> {
    world.get_component::<Position>(id).map(|p| p.value)
}

/// Issue a clamped move order.
fn move_to(world: &mut World, unit: EntityId, destination: Vec2, config: &SimConfig) {
    let destination = config.world.bounds.clamp(destination);
    if let Some(craft) = world.get_component_mut::<Spacecraft>(unit) {
        craft.move_to(destination);
    }
}

fn stop(world: &mut World, unit: EntityId) {
    if let Some(craft) = world.get_component_mut::<Spacecraft>(unit) {
        craft.stop();
    }
}

fn face(world: &mut World, unit: EntityId, from: Vec2, toward: Vec2) {
    let heading = toward - from;
    if heading.is_zero() {
        return;
    }
    if let Some(craft) = world.get_component_mut::<Spacecraft>(unit) {
        craft.angle = heading.heading_degrees();
    }
}

fn set_ai_target(world: &mut World, unit: EntityId, target: Option<EntityId>) {
    if let Some(craft) = world.get_component_mut::<Spacecraft>(unit) {
        craft.ai_target = target;
    }
}

// ============================================================================
// Search
// ============================================================================

fn execute_search(world: &mut World, unit: EntityId, config: &SimConfig) {
    let Some(craft) = world.get_component::<Spacecraft>(unit).copied() else {
        return;
    };
    if craft.ai_target.is_some_and(|t| !is_live_target(world, t)) {
        set_ai_target(world, unit, None);
    }

    let found = find_nearest_target(world, unit, f32::INFINITY)
        .or_else(|| find_nearest_planet(world, unit, f32::INFINITY));
    if let Some((target, position)) = found.and_then(|t| position_of(world, t).map(|p| (t, p))) {
        set_ai_target(world, unit, Some(target));
        move_to(world, unit, position, config);
        return;
    }

    // Nothing to shoot: drift toward the opposing fleet, or the middle.
    let hostile = craft.kind.opponent();
    let rally = Vec2::centroid(
        alive_ships(world)
            .into_iter()
            .filter(|ship| ship.kind == hostile)
            .map(|ship| ship.position),
    )
    .unwrap_or(Vec2::ZERO);
    move_to(world, unit, rally, config);
}

// ============================================================================
// Approach
// ============================================================================

fn execute_approach(
    world: &mut World,
    unit: EntityId,
    formation: Option<&GroupFormation>,
    config: &SimConfig,
) {
    let Some(origin) = position_of(world, unit) else {
        return;
    };
    let target = select_best_target(world, unit, formation, false, &config.combat);
    set_ai_target(world, unit, target);
    let target_pos = target.and_then(|t| position_of(world, t));

    let slot = formation.and_then(|f| f.slot_position(unit, &config.formation, &config.world.bounds));
    if let Some(slot) = slot {
        if origin.distance(slot) > config.ai.formation_tolerance {
            move_to(world, unit, slot, config);
        } else {
            stop(world, unit);
            if let Some(target_pos) = target_pos {
                face(world, unit, origin, target_pos);
            }
        }
        return;
    }

    let (Some(target), Some(target_pos)) = (target, target_pos) else {
        return;
    };
    let standoff = if world.has_component::<Planet>(target) {
        config.ai.planet_standoff * config.combat.planet_attack_range
    } else {
        config.ai.ship_standoff * config.combat.firing_range
    };
    let destination = target_pos + target_pos.direction_to(origin) * standoff;
    move_to(world, unit, destination, config);
}

// ============================================================================
// Engage
// ============================================================================

fn execute_engage(
    world: &mut World,
    unit: EntityId,
    info: &TacticalInfo,
    formation: Option<&GroupFormation>,
    config: &SimConfig,
    events: &mut Vec<CombatEvent>,
) {
    let Some(origin) = position_of(world, unit) else {
        return;
    };

    let slot = formation.and_then(|f| f.slot_position(unit, &config.formation, &config.world.bounds));
    if let Some(slot) = slot {
        if origin.distance(slot) > 2.0 * config.ai.formation_tolerance {
            move_to(world, unit, slot, config);
        } else {
            stop(world, unit);
        }
    }

    let Some(target) = select_best_target(world, unit, formation, true, &config.combat) else {
        return;
    };
    let Some(target_pos) = position_of(world, target) else {
        return;
    };
    set_ai_target(world, unit, Some(target));
    face(world, unit, origin, target_pos);

    if let Some(projectile) = fire_weapon(world, unit, Some(target), target_pos, &config.combat) {
        events.push(CombatEvent::WeaponFired {
            shooter: unit,
            projectile,
            position: origin,
        });
    }

    if slot.is_some() {
        return;
    }
    let firing_range = config.combat.firing_range;
    if origin.distance(target_pos) < config.ai.point_blank * firing_range && info.outnumbered() {
        let destination = target_pos + target_pos.direction_to(origin) * (config.ai.back_off * firing_range);
        move_to(world, unit, destination, config);
    } else {
        stop(world, unit);
    }
}

// ============================================================================
// Retreat
// ============================================================================

/// Nearest healthy ally standing between `origin` and `threat` that the unit
/// can reach, if any.
fn shield_ally(
    allies: &[ShipView],
    origin: Vec2,
    threat: Vec2,
    config: &SimConfig,
) -> Option<Vec2> {
    let to_threat = threat - origin;
    let threat_distance = origin.distance(threat);

    let mut best: Option<(Vec2, f32)> = None;
    for ally in allies {
        if ally.health_fraction <= config.ai.healthy_ally_fraction {
            continue;
        }
        let between = (ally.position - origin).dot(to_threat) > 0.0
            && ally.position.distance(threat) < threat_distance;
        let distance = origin.distance(ally.position);
        if !between || distance > config.combat.firing_range {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((ally.position, distance));
        }
    }
    best.map(|(position, _)| position)
}

/// Ally to fall back on when no threat is close: healthy, near, and
/// preferably not retreating itself.
fn regroup_ally(allies: &[ShipView], origin: Vec2) -> Option<Vec2> {
    let mut best: Option<(Vec2, f32)> = None;
    for ally in allies {
        if ally.health_fraction < 0.5 {
            continue;
        }
        let proximity = 1.0 / (1.0 + origin.distance(ally.position));
        let steadiness = if ally.ai_state == AiState::Retreat { 0.0 } else { 0.5 };
        let score = ally.health_fraction + proximity + steadiness;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((ally.position, score));
        }
    }
    best.map(|(position, _)| position)
}

fn allies_of(world: &World, unit: EntityId) -> Vec<ShipView> {
    let Some(side) = world.get_component::<Spacecraft>(unit).map(|c| c.kind) else {
        return Vec::new();
    };
    alive_ships(world)
        .into_iter()
        .filter(|ship| ship.kind == side && ship.id != unit)
        .collect()
}

fn execute_retreat(world: &mut World, unit: EntityId, config: &SimConfig) {
    let Some(origin) = position_of(world, unit) else {
        return;
    };
    let allies = allies_of(world, unit);
    let firing_range = config.combat.firing_range;

    let threat = find_nearest_target(world, unit, config.ai.threat_scan * firing_range)
        .and_then(|t| position_of(world, t));
    let Some(threat) = threat else {
        if let Some(ally) = regroup_ally(&allies, origin) {
            move_to(world, unit, ally, config);
        } else if let Some(center) = Vec2::centroid(allies.iter().map(|a| a.position)) {
            move_to(world, unit, center, config);
        } else {
            stop(world, unit);
        }
        return;
    };

    if let Some(ally) = shield_ally(&allies, origin, threat, config) {
        let cover = ally + threat.direction_to(ally) * config.ai.hide_offset;
        move_to(world, unit, cover, config);
        return;
    }

    let mut away = threat.direction_to(origin);
    if away.is_zero() {
        away = Vec2::UP;
    }
    let destination = config
        .world
        .bounds
        .clamp(threat + away * (config.ai.flee_distance * firing_range));
    let Some(craft) = world.get_component::<Spacecraft>(unit) else {
        return;
    };
    if !craft.is_moving || craft.destination.distance(destination) > config.ai.min_move_threshold {
        move_to(world, unit, destination, config);
    }
}

// ============================================================================
// Regroup
// ============================================================================

fn execute_regroup(world: &mut World, unit: EntityId, config: &SimConfig) {
    let Some(origin) = position_of(world, unit) else {
        return;
    };
    let nearest = allies_of(world, unit)
        .into_iter()
        .map(|ally| (ally.position, origin.distance(ally.position)))
        .fold(None, |best: Option<(Vec2, f32)>, (position, distance)| match best {
            Some((_, d)) if d <= distance => best,
            _ => Some((position, distance)),
        });

    let Some((ally, distance)) = nearest else {
        move_to(world, unit, Vec2::ZERO, config);
        return;
    };
    let spacing = config.ai.regroup_spacing * config.combat.firing_range;
    if distance > spacing {
        let destination = ally + ally.direction_to(origin) * spacing;
        move_to(world, unit, destination, config);
    } else {
        stop(world, unit);
    }
}
