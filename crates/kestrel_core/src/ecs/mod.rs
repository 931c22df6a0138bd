//! # Entity Component System
//!
//! Sparse-set ECS with an explicit component registry.
//!
//! ## Design
//!
//! - One [`SparseSet`] per registered component type
//! - Entity handles are slot indices with version counters
//! - Every entity also carries a [`Guid`] that is never reissued
//! - Views are driven by the smallest participating column

mod component;
mod entity;
mod game_object;
mod registry;
mod sparse_set;
mod view;

pub use component::{Component, ComponentTypeId, Velocity, MAX_COMPONENT_TYPES};
pub use entity::{Entity, EntityHandle, Guid, GuidGenerator};
pub use game_object::{GameObject, GameObjectMut, GameObjectPoolId, SpawnProfileId};
pub use registry::{ComponentMut, ComponentRef, EntityRegistry};
pub use sparse_set::{SparseSet, TOMBSTONE};
pub use view::{Query, QueryTerm, View, ViewFilter};
