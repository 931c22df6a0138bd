//! # Core Error Types
//!
//! Contract violations surface as `Err` values. Capacity exhaustion and
//! stale handles are not errors; they are `None`/`false` returns.

use thiserror::Error;

use crate::ecs::{EntityHandle, GameObjectPoolId, Guid};

/// Errors raised by the entity registry and views.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component type was used before being registered.
    #[error("component type `{0}` is not registered")]
    UnregisteredComponent(&'static str),

    /// The registry ran out of component type slots.
    #[error("component type limit reached: at most {limit} types can be registered")]
    TooManyComponentTypes {
        /// Maximum number of component types.
        limit: usize,
    },

    /// The handle refers to a destroyed entity or an older version of its slot.
    #[error("stale or invalid entity handle {0}")]
    StaleHandle(EntityHandle),

    /// The entity is alive but lacks a component the caller assumed present.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        /// The entity that was queried.
        entity: EntityHandle,
        /// The missing component's type name.
        component: &'static str,
    },

    /// A component column is already borrowed in a conflicting way.
    #[error("component `{0}` is already borrowed")]
    BorrowConflict(&'static str),

    /// An entity with this GUID already exists.
    #[error("duplicate guid {0}")]
    DuplicateGuid(Guid),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised by the pooling subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No pool is registered under this id.
    #[error("game object pool {0} not found")]
    PoolNotFound(GameObjectPoolId),

    /// A pool is already registered under this id.
    #[error("game object pool {0} already exists")]
    DuplicatePool(GameObjectPoolId),

    /// Pools must hold at least one object.
    #[error("game object pool {0} must have a non-zero size")]
    EmptyPool(GameObjectPoolId),

    /// The pool prototype or the registry rejected an operation.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
