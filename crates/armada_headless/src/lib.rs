//! Headless game runner for CI and balance testing.
//!
//! Loads a RON [`Scenario`], runs the simulation without graphics and
//! reports [`GameMetrics`] as JSON. This enables:
//!
//! - **CI verification**: Automated testing of game logic and determinism
//! - **Balance sweeps**: Many seeds in parallel with aggregate statistics
//!
//! # Example
//!
//! ```bash
//! # Run a scenario
//! cargo run -p armada_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Verify determinism
//! cargo run -p armada_headless -- verify --scenario siege --runs 8
//! ```

pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use game_runner::{run_game, GameConfig, GameResult, StopReason};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector};
pub use scenario::{PlanetPlacement, Scenario, ScenarioError, ShipPlacement};
