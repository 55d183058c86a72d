//! Target selection.
//!
//! Picks what a unit should shoot at. Formation orders win over free choice;
//! otherwise ships beat planets and the nearest candidate wins. Scans walk
//! entities in ascending id order, so equal distances resolve to the lowest
//! id.

use crate::components::{Health, Planet, Position, Spacecraft};
use crate::config::CombatTuning;
use crate::ecs::{EntityId, World};
use crate::formation::GroupFormation;
use crate::tactics::is_live_target;

/// Firing range that applies against `target`: planets use the longer
/// planet attack range, everything else the ship firing range.
#[must_use]
pub fn engagement_range(world: &World, target: EntityId, combat: &CombatTuning) -> f32 {
    if world.has_component::<Planet>(target) {
        combat.planet_attack_range
    } else {
        combat.firing_range
    }
}

/// Nearest alive hostile spacecraft strictly closer than `max_range`.
///
/// Pass `f32::INFINITY` for an unlimited scan.
#[must_use]
pub fn find_nearest_target(world: &World, unit: EntityId, max_range: f32) -> Option<EntityId> {
    let origin = world.get_component::<Position>(unit)?.value;
    let side = world.get_component::<Spacecraft>(unit)?.kind;

    let mut best: Option<(EntityId, f32)> = None;
    for id in world.ids::<Spacecraft>() {
        if id == unit {
            continue;
        }
        let Some(craft) = world.get_component::<Spacecraft>(id) else {
            continue;
        };
        if craft.kind == side {
            continue;
        }
        let (Some(position), Some(health)) = (
            world.get_component::<Position>(id),
            world.get_component::<Health>(id),
        ) else {
            continue;
        };
        if !health.is_alive {
            continue;
        }

        let distance = origin.distance(position.value);
        let limit = best.map_or(max_range, |(_, d)| d);
        if distance < limit {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Nearest alive planet not owned by the unit's side, strictly closer than `max_range`.
#[must_use]
pub fn find_nearest_planet(world: &World, unit: EntityId, max_range: f32) -> Option<EntityId> {
    let origin = world.get_component::<Position>(unit)?.value;
    let side = world.get_component::<Spacecraft>(unit)?.kind;

    let mut best: Option<(EntityId, f32)> = None;
    for id in world.ids::<Planet>() {
        let Some(planet) = world.get_component::<Planet>(id) else {
            continue;
        };
        if side.owns_planet(planet.is_player_owned) || !is_live_target(world, id) {
            continue;
        }
        let Some(position) = world.get_component::<Position>(id) else {
            continue;
        };

        let distance = origin.distance(position.value);
        let limit = best.map_or(max_range, |(_, d)| d);
        if distance < limit {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Choose the best target for `unit`.
///
/// Priority, first match wins:
/// 1. The target of the unit's active formation. With
///    `engagement_range_only` it must also be within its engagement range.
/// 2. The nearest hostile ship (within firing range when restricted).
/// 3. The nearest hostile planet (within planet attack range when restricted).
///
/// A restricted result always implies an unrestricted one exists.
#[must_use]
pub fn select_best_target(
    world: &World,
    unit: EntityId,
    formation: Option<&GroupFormation>,
    engagement_range_only: bool,
    combat: &CombatTuning,
) -> Option<EntityId> {
    let origin = world.get_component::<Position>(unit)?.value;

    if let Some(target) = formation
        .filter(|f| f.active)
        .map(|f| f.target)
        .filter(|&target| is_live_target(world, target))
    {
        if !engagement_range_only {
            return Some(target);
        }
        let in_range = world
            .get_component::<Position>(target)
            .is_some_and(|p| origin.distance(p.value) <= engagement_range(world, target, combat));
        if in_range {
            return Some(target);
        }
    }

    let (ship_range, planet_range) = if engagement_range_only {
        (combat.firing_range, combat.planet_attack_range)
    } else {
        (f32::INFINITY, f32::INFINITY)
    };

    find_nearest_target(world, unit, ship_range)
        .or_else(|| find_nearest_planet(world, unit, planet_range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SpacecraftType;
    use crate::formation::FormationKind;
    use crate::math::Vec2;
    use proptest::prelude::*;

    fn ship(world: &mut World, kind: SpacecraftType, x: f32, y: f32) -> EntityId {
        let id = world.create_entity();
        world.add_component(id, Position::at(x, y));
        world.add_component(id, Spacecraft::new(kind));
        world.add_component(id, Health::new(10));
        id
    }

    fn planet(world: &mut World, player_owned: bool, x: f32, y: f32) -> EntityId {
        let id = world.create_entity();
        world.add_component(id, Position::at(x, y));
        world.add_component(id, Planet::new(0.1, player_owned));
        world.add_component(id, Health::new(100));
        id
    }

    fn formation_on(target: EntityId, members: Vec<EntityId>) -> GroupFormation {
        GroupFormation::new(FormationKind::MassAttack, members, target, Vec2::ZERO)
    }

    #[test]
    fn test_nearest_target_ignores_own_side_and_dead() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        ship(&mut world, SpacecraftType::Enemy, 0.05, 0.0);
        let dead = ship(&mut world, SpacecraftType::Player, 0.1, 0.0);
        world.get_component_mut::<Health>(dead).unwrap().apply_damage(99);
        let live = ship(&mut world, SpacecraftType::Player, 0.3, 0.0);

        assert_eq!(find_nearest_target(&world, unit, f32::INFINITY), Some(live));
    }

    #[test]
    fn test_range_boundary_is_exclusive() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        ship(&mut world, SpacecraftType::Player, 0.5, 0.0);
        assert_eq!(find_nearest_target(&world, unit, 0.5), None);
        assert!(find_nearest_target(&world, unit, 0.500_01).is_some());
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        let first = ship(&mut world, SpacecraftType::Player, 0.2, 0.0);
        ship(&mut world, SpacecraftType::Player, -0.2, 0.0);
        assert_eq!(find_nearest_target(&world, unit, f32::INFINITY), Some(first));
    }

    #[test]
    fn test_planet_selected_when_no_ships() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Player, 0.0, 0.0);
        let enemy_planet = planet(&mut world, false, 0.3, 0.0);
        planet(&mut world, true, 0.1, 0.0);

        assert_eq!(
            select_best_target(&world, unit, None, false, &CombatTuning::default()),
            Some(enemy_planet)
        );
    }

    #[test]
    fn test_ships_beat_planets() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        planet(&mut world, true, 0.1, 0.0);
        let far_ship = ship(&mut world, SpacecraftType::Player, 0.9, 0.0);
        assert_eq!(
            select_best_target(&world, unit, None, false, &CombatTuning::default()),
            Some(far_ship)
        );
    }

    #[test]
    fn test_planet_uses_longer_engagement_range() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        let target = planet(&mut world, true, 0.6, 0.0);
        let combat = CombatTuning::default();
        assert_eq!(engagement_range(&world, target, &combat), combat.planet_attack_range);
        assert_eq!(select_best_target(&world, unit, None, true, &combat), Some(target));
    }

    #[test]
    fn test_formation_target_overrides_nearest() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        ship(&mut world, SpacecraftType::Player, 0.1, 0.0);
        let ordered = ship(&mut world, SpacecraftType::Player, 0.8, 0.0);
        let formation = formation_on(ordered, vec![unit]);
        let combat = CombatTuning::default();

        assert_eq!(
            select_best_target(&world, unit, Some(&formation), false, &combat),
            Some(ordered)
        );
        // Out of engagement range: fall back to the nearest ship in range.
        let restricted = select_best_target(&world, unit, Some(&formation), true, &combat);
        assert_ne!(restricted, Some(ordered));
        assert!(restricted.is_some());
    }

    #[test]
    fn test_dead_formation_target_is_skipped() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        let ordered = ship(&mut world, SpacecraftType::Player, 0.2, 0.0);
        world.get_component_mut::<Health>(ordered).unwrap().apply_damage(99);
        let formation = formation_on(ordered, vec![unit]);
        assert_eq!(
            select_best_target(&world, unit, Some(&formation), false, &CombatTuning::default()),
            None
        );
    }

    fn arb_point() -> impl Strategy<Value = (f32, f32)> {
        (-1.0f32..1.0, -0.75f32..0.75)
    }

    proptest! {
        #[test]
        fn prop_engagement_implies_detection(
            unit_pos in arb_point(),
            players in proptest::collection::vec(arb_point(), 0..6),
            planets in proptest::collection::vec((arb_point(), any::<bool>()), 0..4),
            with_formation in any::<bool>(),
        ) {
            let mut world = World::new();
            let unit = ship(&mut world, SpacecraftType::Enemy, unit_pos.0, unit_pos.1);
            let mut player_ids = Vec::new();
            for (x, y) in players {
                player_ids.push(ship(&mut world, SpacecraftType::Player, x, y));
            }
            for ((x, y), owned) in planets {
                planet(&mut world, owned, x, y);
            }
            let formation = player_ids
                .first()
                .filter(|_| with_formation)
                .map(|&target| formation_on(target, vec![unit]));
            let combat = CombatTuning::default();

            if select_best_target(&world, unit, formation.as_ref(), true, &combat).is_some() {
                prop_assert!(
                    select_best_target(&world, unit, formation.as_ref(), false, &combat).is_some()
                );
            }
        }
    }
}
