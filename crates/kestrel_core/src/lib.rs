//! # Kestrel Core
//!
//! Sparse-set Entity Component System designed for:
//! - Thousands of short-lived entities (projectiles, particles, enemies)
//! - O(1) create, destroy, insert, remove and membership tests
//! - Zero allocation churn once pools are warmed
//!
//! ## Architecture Rules
//!
//! 1. **Handles are generation-checked** - a stale handle is rejected, never aliased
//! 2. **Storage is dense** - components live in contiguous arrays per type
//! 3. **Structural mutation needs `&mut`** - views only mutate component values
//!
//! ## Example
//!
//! ```rust,ignore
//! use kestrel_core::{EntityRegistry, Transform, Velocity};
//!
//! let mut registry = EntityRegistry::with_capacity(1024, 7);
//! registry.register_component::<Transform>()?;
//! registry.register_component::<Velocity>()?;
//!
//! registry.find::<(&mut Transform, &Velocity)>()?.each(|_, (transform, velocity)| {
//!     transform.position += velocity.0;
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ecs;
pub mod error;
pub mod memory;

pub use ecs::{
    Component, ComponentMut, ComponentRef, ComponentTypeId, Entity, EntityHandle,
    EntityRegistry, GameObject, GameObjectMut, GameObjectPoolId, Guid, GuidGenerator, Query,
    QueryTerm, SpawnProfileId, SparseSet, Velocity, View, ViewFilter,
};
pub use error::{EcsError, EcsResult, PoolError, PoolResult};
pub use kestrel_shared::{Aabb, Transform, Vec3};
pub use memory::{GameObjectPool, GameObjectPoolManager, GameObjectPoolRegistry, PoolSlot, PoolStats};
