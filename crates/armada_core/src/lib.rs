//! # Armada Core
//!
//! Deterministic simulation core for Armada, a small real-time space
//! strategy game: ships fight over planets that build more ships, and an
//! enemy combat AI decides, coordinates and shoots.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO beyond explicit config and snapshot helpers
//! - No system randomness (a seeded RNG drives spawns and nudges)
//!
//! This separation enables:
//! - Headless runs and scenario testing
//! - Snapshots that resume identically
//! - Determinism testing via state hashes
//!
//! ## Crate Structure
//!
//! - [`ecs`] - Entity store with one sparse table per component type
//! - [`components`] - Component definitions
//! - [`tactics`] - Tactical situation analysis
//! - [`targeting`] - Target selection
//! - [`ai`] - Per-unit combat state machine
//! - [`formation`] - Group coordination and formations
//! - [`combat`] - Weapons, projectile hits and damage
//! - [`systems`] - Movement, production, waves and cleanup
//! - [`simulation`] - Core simulation loop
//! - [`config`] - Tuning loaded from RON
//! - [`math`] - Vector math and the seeded RNG

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod components;
pub mod config;
pub mod ecs;
pub mod error;
pub mod formation;
pub mod math;
pub mod simulation;
pub mod systems;
pub mod tactics;
pub mod targeting;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{decide_state, update_ai_state_machine, CombatAi};
    pub use crate::combat::{fire_weapon, CombatEvent};
    pub use crate::components::*;
    pub use crate::config::{AiTuning, CombatTuning, FormationTuning, SimConfig, WorldTuning};
    pub use crate::ecs::{EntityId, World, INVALID_ENTITY};
    pub use crate::error::{GameError, Result};
    pub use crate::formation::{FormationKind, GroupCoordinator, GroupFormation};
    pub use crate::math::{ScreenBounds, SimRng, Vec2};
    pub use crate::simulation::{Simulation, TickEvents, TICK_DT, TICK_RATE};
    pub use crate::systems::Outcome;
    pub use crate::tactics::{analyze, TacticalInfo};
    pub use crate::targeting::select_best_target;
}
