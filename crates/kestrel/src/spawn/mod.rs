//! # Spawning
//!
//! A [`SpawnProfile`] bundles a pool with a [`SpawnPlacer`] and a
//! [`SpawnInitializer`]. The [`SpawnManager`] executes spawn, despawn and
//! spawn plan commands against those profiles during the flush phase.

mod initializer;
mod manager;
mod placer;
mod profile;

pub use initializer::{
    EmitterVelocityInitializer, InitializerChain, LifetimeInitializer, NoopInitializer,
    SpawnInitializer, VelocityInitializer,
};
pub use manager::SpawnManager;
pub use placer::{AxisDistributionPlacer, Axis, EmitterPlacer, FixedPlacer, RandomPlacer, SpawnPlacer};
pub use profile::{
    EmitterContext, SpawnContext, SpawnPlanCursor, SpawnProfile, SpawnProfileRegistry, SpawnRuleId,
};
