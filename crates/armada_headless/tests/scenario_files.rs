//! The shipped scenario files parse and match the built-in scenarios.

use std::path::PathBuf;

use armada_headless::{run_game, GameConfig, Scenario, StopReason};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

#[test]
fn test_shipped_skirmish_matches_builtin() {
    let loaded = Scenario::load(scenario_path("skirmish.ron")).unwrap();
    assert_eq!(loaded, Scenario::skirmish());
}

#[test]
fn test_shipped_siege_matches_builtin() {
    let loaded = Scenario::load(scenario_path("siege.ron")).unwrap();
    assert_eq!(loaded, Scenario::siege());
}

#[test]
fn test_siege_runs_headless() {
    let scenario = Scenario::load(scenario_path("siege.ron")).unwrap();
    let result = run_game(GameConfig::from_scenario(scenario).with_max_ticks(600));

    assert!(matches!(
        result.stop_reason,
        StopReason::TickLimit | StopReason::Defeat
    ));
    assert_eq!(result.metrics.enemy.starting_ships, 6);
    assert!(result.metrics.enemy.shots_fired > 0 || result.metrics.player.shots_fired > 0);
}
