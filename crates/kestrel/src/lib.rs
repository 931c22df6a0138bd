//! # Kestrel
//!
//! The engine layer on top of the `kestrel_core` ECS runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              GameWorld                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐  commands   ┌──────────────────────────────────┐   │
//! │  │    Systems      │────────────>│   WorldCommandDispatcher         │   │
//! │  │                 │             │                                  │   │
//! │  │  • Movement     │             │  despawn -> spawn -> plan ->     │   │
//! │  │  • Lifetime     │             │  game state                      │   │
//! │  │  • Collision    │             └───────────────┬──────────────────┘   │
//! │  │  • Scheduler    │                             │                      │
//! │  │  • Render       │                             v                      │
//! │  └────────┬────────┘             ┌──────────────────────────────────┐   │
//! │           │ &EntityRegistry      │   SpawnManager                   │   │
//! │           v                      │  pool -> placer -> initializer   │   │
//! │  ┌─────────────────┐  &mut       └───────────────┬──────────────────┘   │
//! │  │ EntityRegistry  │<────────────────────────────┘                      │
//! │  │ + pools         │                                                    │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! └──────────── events ──> EventBus ──> host (render, audio, UI) ───────────┘
//! ```
//!
//! ## Modules
//!
//! - `game_loop`: the [`System`] trait, [`UpdateContext`] and [`GameWorld`]
//! - `commands`: deferred structural changes and their dispatch
//! - `spawn`: spawn profiles, placers, initializers and the spawn manager
//! - `collision`: uniform-grid collision detection
//! - `systems`: built-in systems
//! - `events`, `render`, `input`: boundaries to the host

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collision;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod game_loop;
pub mod input;
pub mod render;
pub mod spawn;
pub mod state;
pub mod systems;

// Re-export the runtime
pub use kestrel_core as core;
pub use kestrel_shared::{Aabb, Transform, Vec3};

// Re-export commonly used types
pub use collision::{
    AabbColliderComponent, CollisionComponent, CollisionGrid, CollisionLayer,
    GridCollisionDetectionSystem,
};
pub use commands::{CommandBuffer, CommandKind, FlushReport, WorldCommand, WorldCommandDispatcher};
pub use config::EngineConfig;
pub use error::{CommandError, ConfigError, EngineError, EngineResult, GridError, SpawnError};
pub use events::{EventBus, EventReceiver, EventSender, GameEvent};
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameWorld, System, UpdateContext};
pub use input::{InputSnapshot, Key};
pub use render::{RenderCommand, RenderQueue, Renderable};
pub use spawn::{SpawnContext, SpawnManager, SpawnProfile, SpawnRuleId};
pub use state::GameState;
pub use systems::{Lifetime, SpawnRule, SpawnSchedulerSystem};
