//! Group coordination.
//!
//! The [`GroupCoordinator`] periodically looks at every AI unit that is free
//! (alive, not already in a formation, not retreating or regrouping) and
//! rallies them into a [`GroupFormation`] against one strategic target:
//!
//! - **Mass attack**: enough free units and a player ship within reach.
//! - **Surround**: a strategic target is low on hit points.
//!
//! Formations follow their target, and dissolve when it dies or when their
//! lifetime runs out. Dissolution always sends members back to
//! [`AiState::Search`] with no target, so nobody is left steering toward a
//! slot that no longer exists.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::ai::set_ai_state;
use crate::components::{AiState, Health, Position, Spacecraft, SpacecraftType};
use crate::config::{FormationTuning, SimConfig};
use crate::ecs::{EntityId, World, INVALID_ENTITY};
use crate::math::{ScreenBounds, Vec2};
use crate::tactics::{alive_planets, alive_ships, is_live_target, most_vulnerable, ShipView};

/// Formation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormationKind {
    /// Tight two-row ring converging on the target.
    MassAttack,
    /// Wide ring closing around a weakened target.
    Surround,
}

/// Geometry of slot `index` out of `count` around the formation center.
///
/// Slots are spread evenly on a ring (`2π·i/n`). Mass attacks stagger odd
/// slots outward to form a second row.
#[must_use]
pub fn slot_offset(kind: FormationKind, index: usize, count: usize, tuning: &FormationTuning) -> Vec2 {
    let count = count.max(1);
    let angle = TAU * index as f32 / count as f32;
    let radius = match kind {
        FormationKind::MassAttack if index % 2 == 1 => {
            tuning.mass_attack_radius + tuning.mass_attack_row_spacing
        }
        FormationKind::MassAttack => tuning.mass_attack_radius,
        FormationKind::Surround => tuning.surround_radius,
    };
    Vec2::ZERO.offset_polar(angle, radius)
}

/// A group of AI units sharing one target and a positioning pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupFormation {
    /// First member; `INVALID_ENTITY` for an empty formation.
    pub leader: EntityId,
    /// Members in slot order.
    pub members: Vec<EntityId>,
    /// Shared target.
    pub target: EntityId,
    /// Ring center, tracking the target.
    pub center: Vec2,
    /// Pattern.
    pub kind: FormationKind,
    /// Seconds since creation.
    pub age: f32,
    /// Whether members should still follow it.
    pub active: bool,
}

impl GroupFormation {
    /// Create an active formation.
    #[must_use]
    pub fn new(kind: FormationKind, members: Vec<EntityId>, target: EntityId, center: Vec2) -> Self {
        Self {
            leader: members.first().copied().unwrap_or(INVALID_ENTITY),
            members,
            target,
            center,
            kind,
            age: 0.0,
            active: true,
        }
    }

    /// Whether `unit` is a member.
    #[must_use]
    pub fn contains(&self, unit: EntityId) -> bool {
        self.members.contains(&unit)
    }

    /// Clamped slot position of `unit`, if it is a member.
    #[must_use]
    pub fn slot_position(
        &self,
        unit: EntityId,
        tuning: &FormationTuning,
        bounds: &ScreenBounds,
    ) -> Option<Vec2> {
        let index = self.members.iter().position(|&m| m == unit)?;
        let offset = slot_offset(self.kind, index, self.members.len(), tuning);
        Some(bounds.clamp(self.center + offset))
    }
}

/// Owns every formation and the cadence they are managed on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupCoordinator {
    formations: Vec<GroupFormation>,
    /// Countdown to the next coordination pass.
    timer: f32,
    /// Time accumulated since the previous pass, used for aging.
    since_last_pass: f32,
    mass_attack_in_progress: bool,
    surround_in_progress: bool,
}

impl GroupCoordinator {
    /// Create a coordinator with no formations. The first pass runs on the
    /// first update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All current formations.
    #[must_use]
    pub fn formations(&self) -> &[GroupFormation] {
        &self.formations
    }

    /// Whether a mass attack has been launched and the formation list has not
    /// emptied since.
    #[must_use]
    pub fn mass_attack_in_progress(&self) -> bool {
        self.mass_attack_in_progress
    }

    /// Whether a surround has been launched and the formation list has not
    /// emptied since.
    #[must_use]
    pub fn surround_in_progress(&self) -> bool {
        self.surround_in_progress
    }

    /// The active formation `unit` belongs to.
    #[must_use]
    pub fn active_formation(&self, unit: EntityId) -> Option<&GroupFormation> {
        self.formations
            .iter()
            .find(|f| f.active && f.contains(unit))
    }

    /// Advance the coordination timer; runs a full pass when it expires.
    ///
    /// Returns `true` if a pass ran this call.
    pub fn update(&mut self, world: &mut World, dt: f32, config: &SimConfig) -> bool {
        self.since_last_pass += dt;
        self.timer -= dt;
        if self.timer > 0.0 {
            return false;
        }
        self.timer = config.formation.coordination_interval;
        let elapsed = std::mem::take(&mut self.since_last_pass);
        self.coordinate(world, elapsed, config);
        true
    }

    /// One coordination pass: bookkeeping first, then new formations.
    pub fn coordinate(&mut self, world: &mut World, elapsed: f32, config: &SimConfig) {
        self.update_formations(world, elapsed, &config.formation);

        if !self.mass_attack_in_progress {
            self.try_mass_attack(world, config);
        }
        if !self.surround_in_progress {
            self.try_surround(world, config);
        }
    }

    /// Age formations, track their targets, prune dead members and dissolve
    /// the ones that expired or lost their target.
    fn update_formations(&mut self, world: &mut World, elapsed: f32, tuning: &FormationTuning) {
        let mut dissolved = Vec::new();

        for formation in &mut self.formations {
            formation.age += elapsed;
            formation.members.retain(|&m| {
                world
                    .get_component::<Health>(m)
                    .is_some_and(|h| h.is_alive)
            });
            formation.leader = formation.members.first().copied().unwrap_or(INVALID_ENTITY);

            let target_live = is_live_target(world, formation.target);
            if let Some(position) = world.get_component::<Position>(formation.target) {
                formation.center = position.value;
            }

            if !target_live || formation.age >= tuning.lifetime || formation.members.is_empty() {
                formation.active = false;
                dissolved.push(formation.clone());
            }
        }
        self.formations.retain(|f| f.active);

        for formation in dissolved {
            tracing::info!(
                kind = ?formation.kind,
                target = formation.target,
                age = formation.age,
                members = formation.members.len(),
                "Formation dissolved"
            );
            for &member in &formation.members {
                set_ai_state(world, member, AiState::Search);
                if let Some(craft) = world.get_component_mut::<Spacecraft>(member) {
                    craft.ai_target = None;
                }
            }
        }

        if self.formations.is_empty() {
            self.mass_attack_in_progress = false;
            self.surround_in_progress = false;
        }
    }

    /// Alive enemy units free to join a formation, ascending id.
    #[must_use]
    pub fn available_units(&self, world: &World) -> Vec<ShipView> {
        alive_ships(world)
            .into_iter()
            .filter(|ship| ship.kind == SpacecraftType::Enemy)
            .filter(|ship| !matches!(ship.ai_state, AiState::Retreat | AiState::Regroup))
            .filter(|ship| self.active_formation(ship.id).is_none())
            .collect()
    }

    /// Best target for a formation gathered around `from`.
    ///
    /// With a strong player fleet the nearest player ship is preferred; else
    /// the most vulnerable player planet; else any player ship in range.
    #[must_use]
    pub fn strategic_target(&self, world: &World, from: Vec2, config: &SimConfig) -> Option<EntityId> {
        let tuning = &config.formation;
        let ships = alive_ships(world);
        let players: Vec<_> = ships
            .iter()
            .filter(|s| s.kind == SpacecraftType::Player)
            .collect();

        let nearest_player = || {
            players
                .iter()
                .map(|s| (s.id, from.distance(s.position)))
                .filter(|&(_, d)| d <= tuning.coordination_range)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        };

        if players.len() >= tuning.ship_priority_count {
            if let Some(id) = nearest_player() {
                return Some(id);
            }
        }

        let planets = alive_planets(world);
        let vulnerable = most_vulnerable(
            planets.iter().filter(|p| {
                p.owner == SpacecraftType::Player
                    && from.distance(p.position) <= tuning.coordination_range
            }),
            &ships,
            config.ai.vulnerable_radius,
        );
        vulnerable.or_else(nearest_player)
    }

    fn try_mass_attack(&mut self, world: &mut World, config: &SimConfig) {
        let tuning = &config.formation;
        let available = self.available_units(world);
        if available.len() < tuning.min_mass_attack_size {
            return;
        }

        let players: Vec<_> = alive_ships(world)
            .into_iter()
            .filter(|s| s.kind == SpacecraftType::Player)
            .collect();
        let player_nearby = available.iter().any(|unit| {
            players
                .iter()
                .any(|p| unit.position.distance(p.position) <= tuning.coordination_range)
        });
        if !player_nearby {
            return;
        }

        let Some(from) = Vec2::centroid(available.iter().map(|s| s.position)) else {
            return;
        };
        let Some(target) = self.strategic_target(world, from, config) else {
            return;
        };

        self.launch(world, FormationKind::MassAttack, &available, target);
        self.mass_attack_in_progress = true;
    }

    fn try_surround(&mut self, world: &mut World, config: &SimConfig) {
        let tuning = &config.formation;
        let available = self.available_units(world);
        if available.len() < tuning.min_surround_size {
            return;
        }

        let Some(from) = Vec2::centroid(available.iter().map(|s| s.position)) else {
            return;
        };
        let Some(target) = self.strategic_target(world, from, config) else {
            return;
        };
        let weakened = world
            .get_component::<Health>(target)
            .is_some_and(|h| h.current_hp < tuning.vulnerable_target_hp);
        if !weakened {
            return;
        }

        self.launch(world, FormationKind::Surround, &available, target);
        self.surround_in_progress = true;
    }

    fn launch(&mut self, world: &mut World, kind: FormationKind, units: &[ShipView], target: EntityId) {
        let center = world
            .get_component::<Position>(target)
            .map_or(Vec2::ZERO, |p| p.value);
        let members: Vec<_> = units.iter().map(|s| s.id).collect();

        for &member in &members {
            set_ai_state(world, member, AiState::Approach);
            if let Some(craft) = world.get_component_mut::<Spacecraft>(member) {
                craft.ai_target = Some(target);
            }
        }

        tracing::info!(?kind, target, members = members.len(), "Formation created");
        self.formations
            .push(GroupFormation::new(kind, members, target, center));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Planet;

    fn ship(world: &mut World, kind: SpacecraftType, x: f32, y: f32) -> EntityId {
        let id = world.create_entity();
        world.add_component(id, Position::at(x, y));
        world.add_component(id, Spacecraft::new(kind));
        world.add_component(id, Health::new(10));
        id
    }

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn test_slot_offsets_spread_on_ring() {
        let tuning = FormationTuning::default();
        let first = slot_offset(FormationKind::Surround, 0, 4, &tuning);
        let second = slot_offset(FormationKind::Surround, 1, 4, &tuning);
        assert!((first.x - tuning.surround_radius).abs() < 1e-5);
        assert!(first.y.abs() < 1e-5);
        assert!(second.x.abs() < 1e-5);
        assert!((second.y - tuning.surround_radius).abs() < 1e-5);
    }

    #[test]
    fn test_mass_attack_staggers_odd_slots() {
        let tuning = FormationTuning::default();
        let even = slot_offset(FormationKind::MassAttack, 2, 6, &tuning).length();
        let odd = slot_offset(FormationKind::MassAttack, 3, 6, &tuning).length();
        assert!((even - tuning.mass_attack_radius).abs() < 1e-5);
        assert!((odd - tuning.mass_attack_radius - tuning.mass_attack_row_spacing).abs() < 1e-5);
    }

    #[test]
    fn test_slot_position_is_clamped() {
        let formation = GroupFormation::new(
            FormationKind::Surround,
            vec![7, 8],
            1,
            Vec2::new(0.99, 0.0),
        );
        let bounds = ScreenBounds::default();
        let slot = formation
            .slot_position(7, &FormationTuning::default(), &bounds)
            .unwrap();
        assert!(bounds.contains(slot));
        assert!(formation.slot_position(9, &FormationTuning::default(), &bounds).is_none());
    }

    #[test]
    fn test_mass_attack_formed_once() {
        let mut world = World::new();
        let units: Vec<_> = (0..5)
            .map(|i| ship(&mut world, SpacecraftType::Enemy, -0.2 + 0.1 * i as f32, 0.0))
            .collect();
        let player = ship(&mut world, SpacecraftType::Player, 0.0, 0.4);

        let mut coordinator = GroupCoordinator::new();
        coordinator.coordinate(&mut world, 0.0, &config());

        assert_eq!(coordinator.formations().len(), 1);
        let formation = &coordinator.formations()[0];
        assert_eq!(formation.kind, FormationKind::MassAttack);
        assert_eq!(formation.members, units);
        assert_eq!(formation.target, player);
        assert!(coordinator.mass_attack_in_progress());

        for &unit in &units {
            let craft = world.get_component::<Spacecraft>(unit).unwrap();
            assert_eq!(craft.ai_state, AiState::Approach);
            assert_eq!(craft.ai_target, Some(player));
        }

        // More free units appear; no second mass attack while one is running.
        for i in 0..5 {
            ship(&mut world, SpacecraftType::Enemy, 0.3, -0.1 * i as f32);
        }
        coordinator.coordinate(&mut world, 1.0, &config());
        let mass_attacks = coordinator
            .formations()
            .iter()
            .filter(|f| f.kind == FormationKind::MassAttack)
            .count();
        assert_eq!(mass_attacks, 1);
    }

    #[test]
    fn test_no_mass_attack_without_player_nearby() {
        let mut world = World::new();
        for i in 0..5 {
            ship(&mut world, SpacecraftType::Enemy, -0.9, 0.1 * i as f32);
        }
        ship(&mut world, SpacecraftType::Player, 0.9, 0.0);
        let mut cfg = config();
        cfg.formation.coordination_range = 0.5;

        let mut coordinator = GroupCoordinator::new();
        coordinator.coordinate(&mut world, 0.0, &cfg);
        assert!(coordinator.formations().is_empty());
        assert!(!coordinator.mass_attack_in_progress());
    }

    #[test]
    fn test_dead_target_dissolves_formation() {
        let mut world = World::new();
        let units: Vec<_> = (0..4)
            .map(|i| ship(&mut world, SpacecraftType::Enemy, 0.1 * i as f32, 0.0))
            .collect();
        let player = ship(&mut world, SpacecraftType::Player, 0.0, 0.3);

        let mut coordinator = GroupCoordinator::new();
        coordinator.coordinate(&mut world, 0.0, &config());
        assert_eq!(coordinator.formations().len(), 1);

        world.get_component_mut::<Health>(player).unwrap().apply_damage(100);
        coordinator.coordinate(&mut world, 1.0, &config());

        assert!(coordinator.formations().is_empty());
        assert!(!coordinator.mass_attack_in_progress());
        for unit in units {
            let craft = world.get_component::<Spacecraft>(unit).unwrap();
            assert_eq!(craft.ai_state, AiState::Search);
            assert_eq!(craft.ai_target, None);
            assert!(coordinator.active_formation(unit).is_none());
        }
    }

    #[test]
    fn test_formation_expires_after_lifetime() {
        let mut world = World::new();
        for i in 0..4 {
            ship(&mut world, SpacecraftType::Enemy, 0.1 * i as f32, 0.0);
        }
        ship(&mut world, SpacecraftType::Player, 0.0, 0.3);

        let mut cfg = config();
        let mut coordinator = GroupCoordinator::new();
        coordinator.coordinate(&mut world, 0.0, &cfg);
        // No replacement mass attack once the first one expires.
        cfg.formation.min_mass_attack_size = 10;

        coordinator.coordinate(&mut world, 14.0, &cfg);
        assert_eq!(coordinator.formations().len(), 1);
        coordinator.coordinate(&mut world, 1.0, &cfg);
        assert!(coordinator.formations().is_empty());
    }

    #[test]
    fn test_formation_follows_target() {
        let mut world = World::new();
        for i in 0..4 {
            ship(&mut world, SpacecraftType::Enemy, 0.1 * i as f32, 0.0);
        }
        let player = ship(&mut world, SpacecraftType::Player, 0.0, 0.3);
        let mut coordinator = GroupCoordinator::new();
        coordinator.coordinate(&mut world, 0.0, &config());

        world.get_component_mut::<Position>(player).unwrap().value = Vec2::new(0.4, 0.4);
        coordinator.coordinate(&mut world, 1.0, &config());
        assert_eq!(coordinator.formations()[0].center, Vec2::new(0.4, 0.4));
    }

    #[test]
    fn test_surround_on_weakened_target() {
        let mut world = World::new();
        let units: Vec<_> = (0..3)
            .map(|i| ship(&mut world, SpacecraftType::Enemy, 0.1 * i as f32, 0.0))
            .collect();
        let player = ship(&mut world, SpacecraftType::Player, 0.0, 0.3);
        world.get_component_mut::<Health>(player).unwrap().current_hp = 2;

        let mut coordinator = GroupCoordinator::new();
        coordinator.coordinate(&mut world, 0.0, &config());

        // Three units are too few for a mass attack but enough to surround.
        assert_eq!(coordinator.formations().len(), 1);
        assert_eq!(coordinator.formations()[0].kind, FormationKind::Surround);
        assert_eq!(coordinator.formations()[0].members, units);
        assert!(coordinator.surround_in_progress());
        assert!(!coordinator.mass_attack_in_progress());
    }

    #[test]
    fn test_retreating_units_are_unavailable() {
        let mut world = World::new();
        let unit = ship(&mut world, SpacecraftType::Enemy, 0.0, 0.0);
        let other = ship(&mut world, SpacecraftType::Enemy, 0.1, 0.0);
        set_ai_state(&mut world, unit, AiState::Retreat);

        let coordinator = GroupCoordinator::new();
        let ids: Vec<_> = coordinator.available_units(&world).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![other]);
    }

    #[test]
    fn test_strategic_target_prefers_vulnerable_planet_for_small_fleets() {
        let mut world = World::new();
        ship(&mut world, SpacecraftType::Player, 0.2, 0.0);
        let planet = world.create_entity();
        world.add_component(planet, Position::at(-0.5, 0.0));
        world.add_component(planet, Planet::new(0.15, true));
        world.add_component(planet, Health::new(100));

        let coordinator = GroupCoordinator::new();
        assert_eq!(
            coordinator.strategic_target(&world, Vec2::ZERO, &config()),
            Some(planet)
        );

        // Three or more player ships: go for the nearest ship instead.
        ship(&mut world, SpacecraftType::Player, 0.4, 0.0);
        ship(&mut world, SpacecraftType::Player, 0.6, 0.0);
        let target = coordinator.strategic_target(&world, Vec2::ZERO, &config());
        assert_ne!(target, Some(planet));
    }

    #[test]
    fn test_update_respects_interval() {
        let mut world = World::new();
        let mut coordinator = GroupCoordinator::new();
        let cfg = config();
        assert!(coordinator.update(&mut world, 0.016, &cfg));
        assert!(!coordinator.update(&mut world, 0.5, &cfg));
        assert!(coordinator.update(&mut world, 0.5, &cfg));
    }
}
