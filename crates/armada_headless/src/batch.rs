//! Batch runs and determinism verification.
//!
//! Runs many games in parallel using rayon, either over a range of seeds
//! (batch) or repeatedly on one seed (verify).

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::game_runner::{run_game, GameConfig, GameResult};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run
    pub scenario: Scenario,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Ticks per game; the scenario's own length when absent
    pub max_ticks: Option<u64>,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            seed_start: scenario.seed,
            scenario,
            game_count,
            parallel_games: 0,
            max_ticks: None,
            output_dir: PathBuf::from("results"),
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set ticks per game
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    fn game_config(&self, seed: u64) -> GameConfig {
        let config = GameConfig::from_scenario(self.scenario.clone()).with_seed(seed);
        match self.max_ticks {
            Some(ticks) => config.with_max_ticks(ticks),
            None => config,
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics, in seed order
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run `f` on a pool of `threads` workers, or on rayon's global pool for 0.
fn with_pool<R: Send>(threads: u32, f: impl FnOnce() -> R + Send) -> R {
    if threads == 0 {
        return f();
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads as usize)
        .build()
    {
        Ok(pool) => pool.install(f),
        Err(e) => {
            warn!(error = %e, "Failed to build thread pool, using the global one");
            f()
        }
    }
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        "Starting batch run: {} games of '{}'",
        config.game_count, config.scenario.name
    );

    let games: Vec<GameMetrics> = with_pool(config.parallel_games, || {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_game(config.game_config(seed)).metrics
            })
            .collect()
    });

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
    }
}

/// Outcome of a determinism verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed every run used.
    pub seed: u64,
    /// Number of runs.
    pub runs: u32,
    /// Ticks each run lasted.
    pub ticks: Vec<u64>,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended in the same state.
    pub deterministic: bool,
}

/// Verify determinism by running the same seed several times in parallel.
pub fn verify_determinism(config: &GameConfig, runs: u32) -> VerifyReport {
    let results: Vec<GameResult> = (0..runs)
        .into_par_iter()
        .map(|_| run_game(config.clone()))
        .collect();

    let hashes: Vec<u64> = results.iter().map(|r| r.final_state_hash).collect();
    let ticks: Vec<u64> = results.iter().map(|r| r.metrics.duration_ticks).collect();
    let deterministic = results.windows(2).all(|w| {
        w[0].final_state_hash == w[1].final_state_hash && w[0].metrics == w[1].metrics
    });
    if !deterministic {
        warn!(scenario = %config.scenario.name, seed = config.seed, ?hashes, "Runs diverged");
    }

    VerifyReport {
        scenario: config.scenario.name.clone(),
        seed: config.seed,
        runs,
        ticks,
        hashes,
        deterministic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(scenario: Scenario) -> BatchConfig {
        BatchConfig::new(scenario, 4).with_max_ticks(240)
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(Scenario::skirmish(), 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_max_ticks(10);

        assert_eq!(config.scenario.name, "skirmish");
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.game_config(12346).max_ticks, 10);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(short(Scenario::skirmish()).with_seed(7));

        assert_eq!(results.games.len(), 4);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![7, 8, 9, 10]);
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_batch_with_own_pool() {
        let mut config = short(Scenario::siege());
        config.parallel_games = 2;
        let results = run_batch(config);
        assert_eq!(results.games.len(), 4);
    }

    #[test]
    fn test_verify_determinism() {
        let config = GameConfig::from_scenario(Scenario::siege())
            .with_seed(12345)
            .with_max_ticks(600);
        let report = verify_determinism(&config, 4);
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 4);
        assert_eq!(report.ticks, vec![report.ticks[0]; 4]);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(short(Scenario::skirmish()));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config.scenario, results.config.scenario);
    }
}
