//! # Object Pooling
//!
//! Pre-warmed pools of reusable game objects.
//!
//! Pools are filled once at setup and never grow. During gameplay an
//! exhausted pool simply fails to hand out an object.

mod pool;
mod pool_manager;

pub use pool::{GameObjectPool, GameObjectPoolRegistry, PoolSlot, PoolStats};
pub use pool_manager::GameObjectPoolManager;
