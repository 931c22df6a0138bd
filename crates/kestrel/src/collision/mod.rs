//! # Collision
//!
//! Uniform-grid broadphase and AABB narrowphase producing
//! [`GameEvent::SolidCollision`] and [`GameEvent::TriggerCollision`].
//!
//! [`GameEvent::SolidCollision`]: crate::events::GameEvent::SolidCollision
//! [`GameEvent::TriggerCollision`]: crate::events::GameEvent::TriggerCollision

mod components;
mod grid;
mod system;

pub use components::{AabbColliderComponent, CollisionComponent, CollisionLayer};
pub use grid::{CollisionGrid, GridBounds, MAX_GRID_CELLS};
pub use system::GridCollisionDetectionSystem;
