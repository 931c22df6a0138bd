//! # Built-in Systems
//!
//! | System | Reads | Writes | Commands |
//! |--------|-------|--------|----------|
//! | [`MovementSystem`] | `Velocity` | `Transform` | - |
//! | [`LifetimeSystem`] | - | `Lifetime` | despawn |
//! | [`AabbSyncSystem`] | `Transform` | `AabbColliderComponent` | - |
//! | [`LevelBoundsSystem`] | `Transform` | - | despawn |
//! | [`SpawnSchedulerSystem`] | delayed events | - | spawn plan |
//! | [`RenderSubmitSystem`] | `Renderable`, `Transform` | render queue | - |

mod bounds;
mod lifetime;
mod movement;
mod render_submit;
mod scheduler;

pub use bounds::LevelBoundsSystem;
pub use lifetime::{Lifetime, LifetimeSystem};
pub use movement::{AabbSyncSystem, MovementSystem};
pub use render_submit::RenderSubmitSystem;
pub use scheduler::{SpawnRule, SpawnRuleTotals, SpawnSchedulerSystem, MAX_PLANS_PER_FRAME};
