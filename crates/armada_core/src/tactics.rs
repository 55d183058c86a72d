//! Tactical situation analysis.
//!
//! Read-only queries over the [`World`]: who is alive where, and a per-unit
//! [`TacticalInfo`] snapshot that drives the state machine in [`crate::ai`].
//!
//! The AI is omniscient by design: counts cover the whole map, not a sensor
//! radius. Scans are linear in the number of ships, which is fine at the
//! unit counts this game reaches.

use serde::{Deserialize, Serialize};

use crate::components::{AiState, Health, Planet, Position, Spacecraft, SpacecraftType};
use crate::config::AiTuning;
use crate::ecs::{EntityId, World};
use crate::math::Vec2;

/// Snapshot of one alive spacecraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipView {
    /// Entity id.
    pub id: EntityId,
    /// World position.
    pub position: Vec2,
    /// Side.
    pub kind: SpacecraftType,
    /// Health fraction in `[0, 1]`.
    pub health_fraction: f32,
    /// Current AI state.
    pub ai_state: AiState,
}

/// Snapshot of one alive planet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetView {
    /// Entity id.
    pub id: EntityId,
    /// World position.
    pub position: Vec2,
    /// Owner side.
    pub owner: SpacecraftType,
    /// Current hit points.
    pub current_hp: i32,
    /// Health fraction in `[0, 1]`.
    pub health_fraction: f32,
}

/// Whether `id` has a position and alive health, i.e. can be shot at.
#[must_use]
pub fn is_live_target(world: &World, id: EntityId) -> bool {
    world.has_component::<Position>(id)
        && world
            .get_component::<Health>(id)
            .is_some_and(|health| health.is_alive)
}

/// The side `id` fights for: a ship's type or a planet's owner.
#[must_use]
pub fn side_of(world: &World, id: EntityId) -> Option<SpacecraftType> {
    world
        .get_component::<Spacecraft>(id)
        .map(|craft| craft.kind)
        .or_else(|| world.get_component::<Planet>(id).map(Planet::owner))
}

/// Whether `target` is alive and fights for the side opposing `side`.
#[must_use]
pub fn is_hostile_target(world: &World, side: SpacecraftType, target: EntityId) -> bool {
    side_of(world, target) == Some(side.opponent()) && is_live_target(world, target)
}

/// Snapshot a single spacecraft if it is alive and positioned.
#[must_use]
pub fn ship_view(world: &World, id: EntityId) -> Option<ShipView> {
    let craft = world.get_component::<Spacecraft>(id)?;
    let position = world.get_component::<Position>(id)?;
    let health = world.get_component::<Health>(id)?;
    if !health.is_alive {
        return None;
    }
    Some(ShipView {
        id,
        position: position.value,
        kind: craft.kind,
        health_fraction: health.fraction(),
        ai_state: craft.ai_state,
    })
}

/// All alive, positioned spacecraft in ascending id order.
#[must_use]
pub fn alive_ships(world: &World) -> Vec<ShipView> {
    world
        .ids::<Spacecraft>()
        .into_iter()
        .filter_map(|id| ship_view(world, id))
        .collect()
}

/// All alive, positioned planets in ascending id order.
#[must_use]
pub fn alive_planets(world: &World) -> Vec<PlanetView> {
    world
        .ids::<Planet>()
        .into_iter()
        .filter_map(|id| {
            let planet = world.get_component::<Planet>(id)?;
            let position = world.get_component::<Position>(id)?;
            let health = world.get_component::<Health>(id)?;
            health.is_alive.then(|| PlanetView {
                id,
                position: position.value,
                owner: planet.owner(),
                current_hp: health.current_hp,
                health_fraction: health.fraction(),
            })
        })
        .collect()
}

/// Number of alive ships of `side` within `radius` of `point`.
#[must_use]
pub fn defenders_near(ships: &[ShipView], side: SpacecraftType, point: Vec2, radius: f32) -> usize {
    ships
        .iter()
        .filter(|ship| ship.kind == side && ship.position.distance(point) <= radius)
        .count()
}

/// Pick the planet with the lowest `defense + health fraction` among `planets`.
///
/// Ties go to the lowest entity id (the first one scanned).
#[must_use]
pub fn most_vulnerable<'a, I>(planets: I, ships: &[ShipView], vulnerable_radius: f32) -> Option<EntityId>
where
    I: IntoIterator<Item = &'a PlanetView>,
{
    let mut best: Option<(EntityId, f32)> = None;
    for planet in planets {
        let defense = defenders_near(ships, planet.owner, planet.position, vulnerable_radius);
        let score = defense as f32 + planet.health_fraction;
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((planet.id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Per-unit tactical snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TacticalInfo {
    /// Alive player ships on the map.
    pub nearby_player_count: usize,
    /// Alive enemy ships on the map, not counting the analyzed unit.
    pub nearby_enemy_count: usize,
    /// Closest hostile ship.
    pub nearest_threat: Option<EntityId>,
    /// Distance to the closest alive player ship.
    pub nearest_player_distance: Option<f32>,
    /// Distance to the closest alive hostile planet.
    pub nearest_planet_distance: Option<f32>,
    /// Weakest hostile planet within the scan range.
    pub most_vulnerable_planet: Option<EntityId>,
    /// Enemies outnumber players by the overwhelming ratio.
    pub player_overwhelmed: bool,
    /// Attacking a planet is not suicidal.
    pub safe_to_attack_planet: bool,
}

impl TacticalInfo {
    /// Whether the analyzed unit faces more player ships than friendly ones.
    #[must_use]
    pub fn outnumbered(&self) -> bool {
        self.nearby_player_count > self.nearby_enemy_count
    }

    /// Whether there is nothing at all to react to.
    #[must_use]
    pub fn isolated(&self) -> bool {
        self.nearby_player_count == 0 && self.nearby_enemy_count == 0
    }
}

/// Build the tactical snapshot for `unit`.
///
/// Returns `None` when the unit has no position or spacecraft record.
#[must_use]
pub fn analyze(world: &World, unit: EntityId, tuning: &AiTuning) -> Option<TacticalInfo> {
    let origin = world.get_component::<Position>(unit)?.value;
    let side = world.get_component::<Spacecraft>(unit)?.kind;
    let hostile = side.opponent();

    let ships = alive_ships(world);
    let mut info = TacticalInfo::default();
    let mut nearest_threat: Option<(EntityId, f32)> = None;

    for ship in ships.iter().filter(|ship| ship.id != unit) {
        let distance = origin.distance(ship.position);
        match ship.kind {
            SpacecraftType::Player => {
                info.nearby_player_count += 1;
                let best = info
                    .nearest_player_distance
                    .map_or(distance, |d| d.min(distance));
                info.nearest_player_distance = Some(best);
            }
            SpacecraftType::Enemy => info.nearby_enemy_count += 1,
        }
        if ship.kind == hostile && nearest_threat.map_or(true, |(_, best)| distance < best) {
            nearest_threat = Some((ship.id, distance));
        }
    }
    info.nearest_threat = nearest_threat.map(|(id, _)| id);

    let planets = alive_planets(world);
    let hostile_planets: Vec<_> = planets.iter().filter(|p| p.owner == hostile).collect();
    info.nearest_planet_distance = hostile_planets
        .iter()
        .map(|p| origin.distance(p.position))
        .min_by(f32::total_cmp);
    info.most_vulnerable_planet = most_vulnerable(
        hostile_planets
            .iter()
            .copied()
            .filter(|p| origin.distance(p.position) <= tuning.planet_scan_range),
        &ships,
        tuning.vulnerable_radius,
    );

    info.player_overwhelmed = info.nearby_enemy_count
        >= info.nearby_player_count * tuning.overwhelming_ratio as usize;
    info.safe_to_attack_planet = info.nearby_player_count == 0 || info.player_overwhelmed;

    Some(info)
}
