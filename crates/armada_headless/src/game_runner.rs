//! Runs one scenario to completion without graphics.
//!
//! The loop is bounded by `max_ticks` and stops early on defeat. Every tick
//! is folded into [`GameMetrics`] by a [`MetricsCollector`].

use std::time::Instant;

use armada_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::scenario::Scenario;

/// Progress logging interval (ticks).
const PROGRESS_LOG_INTERVAL: u64 = 3_600;

/// Maximum entities we'll allow before aborting a run.
const MAX_ENTITIES: usize = 10_000;

/// Warn when a single tick takes longer than this.
const SLOW_TICK_THRESHOLD_MS: u128 = 50;

/// Configuration for a single game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Random seed for determinism.
    pub seed: u64,
    /// Maximum ticks before the run stops.
    pub max_ticks: u64,
    /// Scenario to use.
    pub scenario: Scenario,
    /// Game ID for tracking.
    pub game_id: String,
}

impl GameConfig {
    /// Config using the scenario's own seed and length.
    #[must_use]
    pub fn from_scenario(scenario: Scenario) -> Self {
        Self {
            seed: scenario.seed,
            max_ticks: scenario.max_ticks,
            game_id: format!("{}_{}", scenario.name, scenario.seed),
            scenario,
        }
    }

    /// Override the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.game_id = format!("{}_{}", self.scenario.name, seed);
        self
    }

    /// Override the run length.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The player lost every planet.
    Defeat,
    /// `max_ticks` elapsed.
    TickLimit,
    /// The entity count ran away.
    EntityOverflow,
}

/// Result of a completed game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    /// Collected metrics.
    pub metrics: GameMetrics,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// Final simulation state hash.
    pub final_state_hash: u64,
}

/// Run a game to completion.
pub fn run_game(config: GameConfig) -> GameResult {
    let game_start = Instant::now();
    info!(
        game_id = %config.game_id,
        seed = config.seed,
        max_ticks = config.max_ticks,
        scenario = %config.scenario.name,
        "Starting game simulation"
    );

    let mut sim = config.scenario.build(config.seed);
    let mut collector = MetricsCollector::new(&config.game_id, &config.scenario.name, config.seed);

    info!(
        initial_entities = sim.world().entity_count(),
        ships = sim.world().count::<Spacecraft>(),
        planets = sim.world().count::<Planet>(),
        "Game initialized"
    );

    let mut stop_reason = StopReason::TickLimit;
    while sim.get_tick() < config.max_ticks {
        let entity_count = sim.world().entity_count();
        if entity_count > MAX_ENTITIES {
            warn!(
                tick = sim.get_tick(),
                entity_count,
                max = MAX_ENTITIES,
                "Entity count exceeded maximum - aborting run"
            );
            stop_reason = StopReason::EntityOverflow;
            break;
        }

        collector.track(sim.world());
        let tick_start = Instant::now();
        let events = sim.tick();
        let tick_duration = tick_start.elapsed();
        if tick_duration.as_millis() > SLOW_TICK_THRESHOLD_MS {
            warn!(
                tick = sim.get_tick(),
                duration_ms = tick_duration.as_millis(),
                entities = entity_count,
                "Slow tick detected"
            );
        }
        collector.record_tick(sim.get_tick(), &events, sim.world());

        if let Some(wave) = events.wave {
            debug!(tick = sim.get_tick(), wave, "Wave arrived");
        }
        if sim.get_tick() % PROGRESS_LOG_INTERVAL == 0 {
            info!(
                tick = sim.get_tick(),
                ships = sim.world().count::<Spacecraft>(),
                formations = sim.coordinator().formations().len(),
                "Progress"
            );
        }

        if sim.outcome() == Outcome::Defeat {
            stop_reason = StopReason::Defeat;
            break;
        }
    }

    let metrics = collector.finish(&sim);
    info!(
        game_id = %config.game_id,
        ticks = metrics.duration_ticks,
        outcome = ?metrics.outcome,
        waves = metrics.waves,
        ?stop_reason,
        elapsed_ms = game_start.elapsed().as_millis(),
        "Game finished"
    );

    GameResult {
        final_state_hash: metrics.final_state_hash,
        metrics,
        stop_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{PlanetPlacement, ShipPlacement};

    fn quiet_scenario() -> Scenario {
        let mut config = SimConfig::default();
        config.world.waves_enabled = false;
        Scenario {
            config: Some(config),
            max_ticks: 120,
            ..Scenario::skirmish()
        }
    }

    #[test]
    fn test_runs_to_tick_limit() {
        let result = run_game(GameConfig::from_scenario(quiet_scenario()));
        assert_eq!(result.stop_reason, StopReason::TickLimit);
        assert_eq!(result.metrics.duration_ticks, 120);
        assert_eq!(result.metrics.outcome, Outcome::InProgress);
        assert_eq!(result.metrics.player.starting_ships, 2);
        assert_eq!(result.metrics.enemy.starting_ships, 1);
    }

    #[test]
    fn test_stops_on_defeat() {
        // No player planet at all: defeat is detected on the first tick.
        let scenario = Scenario {
            planets: vec![PlanetPlacement::new(0.5, 0.3, 0.1, false)],
            ships: vec![ShipPlacement::new(SpacecraftType::Enemy, 0.0, 0.0)],
            ..quiet_scenario()
        };
        let result = run_game(GameConfig::from_scenario(scenario));
        assert_eq!(result.stop_reason, StopReason::Defeat);
        assert_eq!(result.metrics.duration_ticks, 1);
        assert!(!result.metrics.survived());
    }

    #[test]
    fn test_same_seed_same_hash() {
        let config = GameConfig::from_scenario(Scenario::skirmish())
            .with_seed(9)
            .with_max_ticks(900);
        let a = run_game(config.clone());
        let b = run_game(config);
        assert_eq!(a.final_state_hash, b.final_state_hash);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_game_id_follows_seed() {
        let config = GameConfig::from_scenario(Scenario::skirmish()).with_seed(4);
        assert_eq!(config.game_id, "skirmish_4");
        assert_eq!(config.seed, 4);
    }
}
