//! Headless Armada runner.
//!
//! Runs scenarios without graphics and prints JSON reports on stdout.
//! Designed for CI testing, balance sweeps and determinism verification.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish and print its metrics
//! cargo run -p armada_headless -- run --scenario skirmish
//!
//! # Run a scenario file with a different seed
//! cargo run -p armada_headless -- run --scenario scenarios/siege.ron --seed 7
//!
//! # Run 100 seeds in parallel
//! cargo run -p armada_headless -- batch --scenario skirmish --count 100 --output results/
//!
//! # Verify determinism
//! cargo run -p armada_headless -- verify --scenario skirmish --runs 5
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use armada_core::config::SimConfig;
use armada_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    game_runner::{run_game, GameConfig},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "armada_headless")]
#[command(about = "Headless Armada runner for scenario playback and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single game and print its metrics
    Run {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Tick limit override
        #[arg(long)]
        ticks: Option<u64>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of seeds in parallel
    Batch {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit override
        #[arg(long)]
        ticks: Option<u64>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick limit override
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Print the default tuning as RON
    Config,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON report
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
            output,
        } => cmd_run(&scenario, seed, ticks, output),
        Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            ticks,
            output,
        } => cmd_batch(&scenario, count, parallel, seed, ticks, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
            ticks,
        } => cmd_verify(&scenario, seed, runs, ticks),
        Commands::Config => cmd_config(),
    }
}

fn load_scenario(name_or_path: &str) -> Scenario {
    match Scenario::resolve(name_or_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, scenario = name_or_path, "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

fn game_config(scenario: Scenario, seed: Option<u64>, ticks: Option<u64>) -> GameConfig {
    let mut config = GameConfig::from_scenario(scenario);
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(ticks) = ticks {
        config = config.with_max_ticks(ticks);
    }
    config
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("FATAL: Failed to encode report: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single game
fn cmd_run(scenario: &str, seed: Option<u64>, ticks: Option<u64>, output: Option<PathBuf>) {
    let config = game_config(load_scenario(scenario), seed, ticks);
    let result = run_game(config);

    match output {
        Some(path) => {
            let written = serde_json::to_string_pretty(&result)
                .map_err(std::io::Error::other)
                .and_then(|json| std::fs::write(&path, json));
            if let Err(e) = written {
                eprintln!("FATAL: Failed to write '{}': {e}", path.display());
                std::process::exit(1);
            }
            tracing::info!(path = %path.display(), "Report written");
        }
        None => print_json(&result),
    }
}

/// Run a batch of games
fn cmd_batch(
    scenario: &str,
    count: u32,
    parallel: u32,
    seed: u64,
    ticks: Option<u64>,
    output: PathBuf,
) {
    let mut config = BatchConfig::new(load_scenario(scenario), count)
        .with_seed(seed)
        .with_output(output.clone());
    config.parallel_games = parallel;
    if let Some(ticks) = ticks {
        config = config.with_max_ticks(ticks);
    }

    let results = run_batch(config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    print_json(&results.summary);
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32, ticks: Option<u64>) {
    let config = game_config(load_scenario(scenario), Some(seed), ticks);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        config.scenario.name,
        seed,
        runs
    );

    let report = verify_determinism(&config, runs);
    print_json(&report);

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Print the default tuning
fn cmd_config() {
    match SimConfig::default().to_ron_string() {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}
