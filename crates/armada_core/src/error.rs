//! Error types for the game simulation.
//!
//! The gameplay systems themselves never fail: a missing component or a
//! stale entity id is reported as `None` and the caller skips that entity.
//! [`GameError`] only covers the edges of the crate - configuration parsing,
//! snapshot encoding and the command API on [`Simulation`](crate::simulation::Simulation).

use thiserror::Error;

use crate::ecs::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Entity exists but lacks a component the operation needs.
    #[error("Entity {entity} has no {component} component")]
    MissingComponent {
        /// Entity that was addressed.
        entity: EntityId,
        /// Name of the missing component.
        component: &'static str,
    },

    /// A command was addressed to an entity that cannot carry it out.
    #[error("Invalid command for entity {entity}: {reason}")]
    InvalidCommand {
        /// Entity that was addressed.
        entity: EntityId,
        /// Why the command was refused.
        reason: &'static str,
    },

    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration text could not be parsed.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Configuration parsed but holds an unusable value.
    #[error("Invalid config value for '{field}': {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Snapshot encode/decode failure.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}
