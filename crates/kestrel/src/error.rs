//! # Engine Error Types
//!
//! Each subsystem has its own error enum; [`EngineError`] aggregates them
//! for the frame loop. Pool exhaustion is never an error.

use std::path::PathBuf;

use kestrel_core::{EcsError, GameObjectPoolId, PoolError, SpawnProfileId};
use thiserror::Error;

use crate::commands::CommandKind;
use crate::state::GameState;

/// Errors raised while routing or applying commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// No handler is registered for the command's target.
    #[error("no handler registered for {command} command targeting {target}")]
    Unrouted {
        /// Kind of command that could not be routed.
        command: CommandKind,
        /// Human-readable routing key (profile or entity).
        target: String,
    },

    /// A game state transition that the state machine forbids.
    #[error("illegal game state transition {from:?} -> {to:?}")]
    IllegalStateTransition {
        /// State before the command.
        from: GameState,
        /// Requested state.
        to: GameState,
    },
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors raised by spawn profile lookup and spawn execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpawnError {
    /// No profile is registered under this id.
    #[error("spawn profile {0} is not registered")]
    UnknownProfile(SpawnProfileId),

    /// A profile is already registered under this id.
    #[error("spawn profile {0} is already registered")]
    DuplicateProfile(SpawnProfileId),

    /// The profile's pool rejected the request.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The registry rejected a component operation on the spawned object.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for spawn operations.
pub type SpawnResult<T> = Result<T, SpawnError>;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for [`EngineConfig`](crate::config::EngineConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Two `[[pools]]` entries share an id.
    #[error("duplicate pool id {0} in config")]
    DuplicatePool(GameObjectPoolId),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a collision grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// Cell size must be finite and positive.
    #[error("collision grid cell size must be positive, got {0}")]
    InvalidCellSize(f32),

    /// Grid bounds must have volume.
    #[error("collision grid bounds are empty")]
    EmptyBounds,

    /// The cell size would split the bounds into too many cells.
    #[error("collision grid of {dims:?} cells exceeds the limit of {max} cells")]
    TooManyCells {
        /// Cells requested along each axis.
        dims: [usize; 3],
        /// Largest allowed cell count.
        max: usize,
    },
}

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Registry or view failure.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// Pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Spawn failure.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Collision grid failure.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// A system failed during its update.
    #[error("system `{system}` failed: {source}")]
    System {
        /// Name of the failing system.
        system: &'static str,
        /// Underlying error.
        #[source]
        source: Box<EngineError>,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
