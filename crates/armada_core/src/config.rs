//! Gameplay tuning.
//!
//! Every constant the simulation uses lives here so that scenarios can
//! override it from RON. Missing fields fall back to the defaults, so a
//! config file only needs to name what it changes:
//!
//! ```
//! use armada_core::config::SimConfig;
//!
//! let config = SimConfig::from_ron_str("(combat: (firing_range: 0.6))").unwrap();
//! assert_eq!(config.combat.firing_range, 0.6);
//! assert_eq!(config.ai.update_interval, 0.1);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::ScreenBounds;

/// Weapon and projectile constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Seconds between shots.
    pub weapon_cooldown: f32,
    /// Projectile travel speed.
    pub projectile_speed: f32,
    /// Projectile lifetime in seconds.
    pub projectile_lifetime: f32,
    /// Damage per projectile hit.
    pub projectile_damage: i32,
    /// Maximum distance at which a ship may fire on another ship.
    pub firing_range: f32,
    /// Maximum distance at which a ship may fire on a planet.
    pub planet_attack_range: f32,
    /// Projectile collision radius.
    pub projectile_radius: f32,
    /// Ship collision radius.
    pub ship_radius: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            weapon_cooldown: 1.0,
            projectile_speed: 1.0,
            projectile_lifetime: 1.5,
            projectile_damage: 1,
            firing_range: 0.5,
            planet_attack_range: 0.7,
            projectile_radius: 0.02,
            ship_radius: 0.03,
        }
    }
}

/// Per-unit state machine constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Seconds between batched state machine evaluations.
    pub update_interval: f32,
    /// Enemy-to-player ratio at which the player counts as overwhelmed.
    pub overwhelming_ratio: u32,
    /// Health fraction below which an outnumbered unit retreats.
    pub retreat_health_fraction: f32,
    /// Radius around a planet in which player ships count as its defense.
    pub vulnerable_radius: f32,
    /// Range within which planets are weighed for vulnerability.
    pub planet_scan_range: f32,
    /// Health fraction above which an ally can shield a retreating unit.
    pub healthy_ally_fraction: f32,
    /// Destination changes smaller than this are not re-issued while retreating.
    pub min_move_threshold: f32,
    /// How far behind a shielding ally a retreating unit hides.
    pub hide_offset: f32,
    /// Distance from a formation slot that still counts as "in position".
    pub formation_tolerance: f32,
    /// Standoff as a fraction of firing range when approaching ships.
    pub ship_standoff: f32,
    /// Standoff as a fraction of planet attack range when approaching planets.
    pub planet_standoff: f32,
    /// Below this fraction of firing range an outnumbered unit backs off.
    pub point_blank: f32,
    /// Back-off distance as a fraction of firing range.
    pub back_off: f32,
    /// Retreat flight distance as a fraction of firing range.
    pub flee_distance: f32,
    /// Threat scan radius while retreating, as a fraction of firing range.
    pub threat_scan: f32,
    /// Regroup spacing as a fraction of firing range.
    pub regroup_spacing: f32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            update_interval: 0.1,
            overwhelming_ratio: 2,
            retreat_health_fraction: 0.2,
            vulnerable_radius: 0.3,
            planet_scan_range: 1.2,
            healthy_ally_fraction: 0.7,
            min_move_threshold: 0.05,
            hide_offset: 0.1,
            formation_tolerance: 0.05,
            ship_standoff: 0.8,
            planet_standoff: 0.9,
            point_blank: 0.3,
            back_off: 0.6,
            flee_distance: 1.8,
            threat_scan: 2.0,
            regroup_spacing: 1.5,
        }
    }
}

/// Group coordination constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationTuning {
    /// Seconds between coordinator passes.
    pub coordination_interval: f32,
    /// Seconds a formation lives before dissolving.
    pub lifetime: f32,
    /// Available units needed for a mass attack.
    pub min_mass_attack_size: usize,
    /// Available units needed for a surround.
    pub min_surround_size: usize,
    /// Targets with fewer hit points than this are surround candidates.
    pub vulnerable_target_hp: i32,
    /// Range for strategic target selection and mass-attack triggering.
    pub coordination_range: f32,
    /// Player ship count at which ships are preferred over planets.
    pub ship_priority_count: usize,
    /// Ring radius for mass-attack slots.
    pub mass_attack_radius: f32,
    /// Extra radius for odd mass-attack slots (second row).
    pub mass_attack_row_spacing: f32,
    /// Ring radius for surround slots.
    pub surround_radius: f32,
}

impl Default for FormationTuning {
    fn default() -> Self {
        Self {
            coordination_interval: 1.0,
            lifetime: 15.0,
            min_mass_attack_size: 4,
            min_surround_size: 3,
            vulnerable_target_hp: 5,
            coordination_range: 1.5,
            ship_priority_count: 3,
            mass_attack_radius: 0.2,
            mass_attack_row_spacing: 0.06,
            surround_radius: 0.35,
        }
    }
}

/// Playfield and collaborator-system constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    /// Playfield clamp for destinations.
    pub bounds: ScreenBounds,
    /// Ship travel speed.
    pub ship_speed: f32,
    /// Distance at which a ship counts as arrived.
    pub arrival_threshold: f32,
    /// Same-side ships closer than this push apart.
    pub separation_radius: f32,
    /// Push strength.
    pub separation_strength: f32,
    /// Seconds to build a spacecraft.
    pub spacecraft_build_time: f32,
    /// Hit points of a new spacecraft.
    pub spacecraft_hp: i32,
    /// Hit points of a new planet.
    pub planet_hp: i32,
    /// Whether enemy waves spawn.
    pub waves_enabled: bool,
    /// Seconds before the first wave.
    pub initial_wave_interval: f32,
    /// Multiplier applied to the wave interval after each wave.
    pub wave_interval_decay: f32,
    /// Floor for the wave interval.
    pub min_wave_interval: f32,
    /// How far outside the screen waves spawn.
    pub spawn_margin: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            bounds: ScreenBounds::default(),
            ship_speed: 0.3,
            arrival_threshold: 0.02,
            separation_radius: 0.05,
            separation_strength: 0.8,
            spacecraft_build_time: 5.0,
            spacecraft_hp: 10,
            planet_hp: 100,
            waves_enabled: true,
            initial_wave_interval: 10.0,
            wave_interval_decay: 0.95,
            min_wave_interval: 3.0,
            spawn_margin: 0.2,
        }
    }
}

/// Complete tuning tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Weapons.
    pub combat: CombatTuning,
    /// Unit AI.
    pub ai: AiTuning,
    /// Group coordination.
    pub formation: FormationTuning,
    /// Playfield and collaborators.
    pub world: WorldTuning,
}

impl SimConfig {
    /// Parse a config from RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            GameError::InvalidConfig {
                field: "config",
                reason: e.to_string(),
            }
        })
    }

    /// Reject values that would stall or break the simulation.
    pub fn validate(&self) -> Result<()> {
        fn positive(field: &'static str, value: f32) -> Result<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(GameError::InvalidConfig {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("ai.update_interval", self.ai.update_interval)?;
        positive("formation.coordination_interval", self.formation.coordination_interval)?;
        positive("formation.lifetime", self.formation.lifetime)?;
        positive("combat.firing_range", self.combat.firing_range)?;
        positive("combat.planet_attack_range", self.combat.planet_attack_range)?;
        positive("world.min_wave_interval", self.world.min_wave_interval)?;

        if self.combat.planet_attack_range < self.combat.firing_range {
            return Err(GameError::InvalidConfig {
                field: "combat.planet_attack_range",
                reason: "must not be shorter than combat.firing_range".to_string(),
            });
        }
        if self.formation.min_mass_attack_size == 0 || self.formation.min_surround_size == 0 {
            return Err(GameError::InvalidConfig {
                field: "formation.min_*_size",
                reason: "formations need at least one member".to_string(),
            });
        }
        Ok(())
    }
}
