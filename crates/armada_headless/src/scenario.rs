//! Scenario loading and configuration.
//!
//! Scenarios define the opening layout for a headless run: planets with
//! their initial build queues, ship placements, run length and an optional
//! tuning override.

use std::path::Path;
use std::result::Result;

use armada_core::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The embedded tuning override was rejected.
    #[error("Invalid scenario config: {0}")]
    InvalidConfig(#[from] GameError),
    /// A placement is unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// A planet at the start of the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetPlacement {
    /// Position (x, y) in field coordinates.
    pub position: (f32, f32),
    /// Planet radius.
    pub radius: f32,
    /// Owned by the player (`true`) or the enemy.
    pub player_owned: bool,
    /// Spacecraft builds queued at start.
    #[serde(default)]
    pub builds: u32,
}

impl PlanetPlacement {
    /// Create a planet placement with an empty queue.
    #[must_use]
    pub fn new(x: f32, y: f32, radius: f32, player_owned: bool) -> Self {
        Self {
            position: (x, y),
            radius,
            player_owned,
            builds: 0,
        }
    }
}

/// One or more ships at the start of the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipPlacement {
    /// Allegiance.
    pub side: SpacecraftType,
    /// Position (x, y) in field coordinates.
    pub position: (f32, f32),
    /// How many ships to stack here; the simulation pushes them apart.
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

impl ShipPlacement {
    /// Create a single-ship placement.
    #[must_use]
    pub fn new(side: SpacecraftType, x: f32, y: f32) -> Self {
        Self {
            side,
            position: (x, y),
            count: 1,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Seed for the simulation RNG.
    #[serde(default)]
    pub seed: u64,
    /// Run length in ticks; the run also stops on defeat.
    pub max_ticks: u64,
    /// Planets.
    pub planets: Vec<PlanetPlacement>,
    /// Ships.
    pub ships: Vec<ShipPlacement>,
    /// Tuning override; defaults apply when absent.
    #[serde(default)]
    pub config: Option<SimConfig>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Resolve a scenario argument: a built-in name or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "skirmish" => Ok(Self::skirmish()),
            "siege" => Ok(Self::siege()),
            path => Self::load(path),
        }
    }

    /// The standard opening: one planet per side, two player ships and an
    /// enemy scout, with waves on their default schedule.
    #[must_use]
    pub fn skirmish() -> Self {
        Self {
            name: "skirmish".to_string(),
            description: "Standard opening against incoming waves".to_string(),
            seed: 0,
            max_ticks: 36_000, // 10 minutes at 60 tps
            planets: vec![
                PlanetPlacement::new(-0.5, 0.0, 0.15, true),
                PlanetPlacement::new(0.5, 0.3, 0.10, false),
            ],
            ships: vec![
                ShipPlacement::new(SpacecraftType::Player, 0.0, -0.4),
                ShipPlacement::new(SpacecraftType::Player, 0.2, 0.2),
                ShipPlacement::new(SpacecraftType::Enemy, -0.3, 0.3),
            ],
            config: None,
        }
    }

    /// An enemy fleet big enough to form up, against a lightly held planet.
    #[must_use]
    pub fn siege() -> Self {
        let mut config = SimConfig::default();
        config.world.waves_enabled = false;
        Self {
            name: "siege".to_string(),
            description: "Six raiders against one defended planet".to_string(),
            seed: 0,
            max_ticks: 7_200,
            planets: vec![PlanetPlacement {
                builds: 2,
                ..PlanetPlacement::new(-0.6, 0.0, 0.15, true)
            }],
            ships: vec![
                ShipPlacement::new(SpacecraftType::Player, -0.35, 0.1),
                ShipPlacement::new(SpacecraftType::Player, -0.35, -0.1),
                ShipPlacement {
                    count: 6,
                    ..ShipPlacement::new(SpacecraftType::Enemy, 0.6, 0.0)
                },
            ],
            config: Some(config),
        }
    }

    /// Effective tuning for this scenario.
    #[must_use]
    pub fn sim_config(&self) -> SimConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Check placements and the tuning override.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if let Some(config) = &self.config {
            config.validate()?;
        }
        if let Some(planet) = self.planets.iter().find(|p| p.radius.is_nan() || p.radius <= 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "planet at {:?} has non-positive radius {}",
                planet.position, planet.radius
            )));
        }
        let finite = |(x, y): (f32, f32)| x.is_finite() && y.is_finite();
        if !self.planets.iter().map(|p| p.position).all(finite)
            || !self.ships.iter().map(|s| s.position).all(finite)
        {
            return Err(ScenarioError::Invalid("non-finite position".to_string()));
        }
        Ok(())
    }

    /// Build the opening simulation with the given seed.
    ///
    /// Planets are spawned before ships, in file order, so entity ids are
    /// stable across runs.
    #[must_use]
    pub fn build(&self, seed: u64) -> Simulation {
        let mut sim = Simulation::new(self.sim_config(), seed);
        for placement in &self.planets {
            let (x, y) = placement.position;
            let planet = sim.spawn_planet(Vec2::new(x, y), placement.radius, placement.player_owned);
            for _ in 0..placement.builds {
                if let Err(e) = sim.queue_build(planet) {
                    tracing::warn!(planet, error = %e, "Could not queue scenario build");
                }
            }
        }
        for placement in &self.ships {
            let (x, y) = placement.position;
            for _ in 0..placement.count {
                sim.spawn_ship(placement.side, Vec2::new(x, y));
            }
        }
        sim
    }
}
