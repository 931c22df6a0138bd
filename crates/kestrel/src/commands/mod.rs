//! # Deferred Commands
//!
//! Systems never spawn, despawn or change the game state directly. They
//! append commands to the frame's [`CommandBuffer`]; once every system has
//! updated, the [`WorldCommandDispatcher`] routes each command to its
//! handler and flushes the handlers in a fixed order:
//!
//! ```text
//!   despawns ──> spawns ──> spawn plans ──> game state
//! ```
//!
//! Despawns go first so that capacity freed this frame is visible to the
//! spawns of the same flush.

mod dispatcher;
mod handler;

use std::fmt;

use kestrel_core::{Aabb, EntityRegistry, GameObjectPoolManager, Guid, SpawnProfileId};

pub use dispatcher::{SpawnHandlerId, WorldCommandDispatcher};
pub use handler::{CommandHandler, GameStateCommandHandler, SpawnCommandHandler};

use crate::error::CommandError;
use crate::events::{DelayedEventQueue, FrameEvents};
use crate::spawn::{SpawnContext, SpawnManager, SpawnRuleId};
use crate::state::{GameState, GameStateManager};

/// Spawn one object from a profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnCommand {
    /// Profile to spawn from.
    pub profile: SpawnProfileId,
    /// Request data handed to the placer and initializer.
    pub context: SpawnContext,
}

/// Return an object to its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DespawnCommand {
    /// Object to despawn.
    pub guid: Guid,
}

/// Spawn a batch from a profile on behalf of a scheduling rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledSpawnPlanCommand {
    /// Rule that issued the plan.
    pub rule: SpawnRuleId,
    /// Profile to spawn from.
    pub profile: SpawnProfileId,
    /// Requested number of objects.
    pub amount: usize,
    /// Request data shared by the whole batch.
    pub context: SpawnContext,
}

/// Move the game state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameStateCommand {
    /// Requested state.
    pub target: GameState,
}

/// Kind tag of a [`WorldCommand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// [`SpawnCommand`].
    Spawn,
    /// [`DespawnCommand`].
    Despawn,
    /// [`ScheduledSpawnPlanCommand`].
    ScheduledSpawnPlan,
    /// [`GameStateCommand`].
    GameState,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spawn => "spawn",
            Self::Despawn => "despawn",
            Self::ScheduledSpawnPlan => "scheduled spawn plan",
            Self::GameState => "game state",
        })
    }
}

/// Any command a system can issue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WorldCommand {
    /// Single spawn.
    Spawn(SpawnCommand),
    /// Single despawn.
    Despawn(DespawnCommand),
    /// Batch spawn.
    ScheduledSpawnPlan(ScheduledSpawnPlanCommand),
    /// State transition.
    GameState(GameStateCommand),
}

impl WorldCommand {
    /// Kind tag.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Spawn(_) => CommandKind::Spawn,
            Self::Despawn(_) => CommandKind::Despawn,
            Self::ScheduledSpawnPlan(_) => CommandKind::ScheduledSpawnPlan,
            Self::GameState(_) => CommandKind::GameState,
        }
    }
}

impl From<SpawnCommand> for WorldCommand {
    fn from(command: SpawnCommand) -> Self {
        Self::Spawn(command)
    }
}

impl From<DespawnCommand> for WorldCommand {
    fn from(command: DespawnCommand) -> Self {
        Self::Despawn(command)
    }
}

impl From<ScheduledSpawnPlanCommand> for WorldCommand {
    fn from(command: ScheduledSpawnPlanCommand) -> Self {
        Self::ScheduledSpawnPlan(command)
    }
}

impl From<GameStateCommand> for WorldCommand {
    fn from(command: GameStateCommand) -> Self {
        Self::GameState(command)
    }
}

/// Commands appended during the update phase, in issue order.
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<WorldCommand>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any command.
    pub fn push(&mut self, command: impl Into<WorldCommand>) {
        self.commands.push(command.into());
    }

    /// Requests a spawn.
    pub fn spawn(&mut self, profile: SpawnProfileId, context: SpawnContext) {
        self.push(SpawnCommand { profile, context });
    }

    /// Requests a despawn.
    pub fn despawn(&mut self, guid: Guid) {
        self.push(DespawnCommand { guid });
    }

    /// Requests a batch spawn.
    pub fn schedule_plan(
        &mut self,
        rule: SpawnRuleId,
        profile: SpawnProfileId,
        amount: usize,
        context: SpawnContext,
    ) {
        self.push(ScheduledSpawnPlanCommand {
            rule,
            profile,
            amount,
            context,
        });
    }

    /// Requests a game state transition.
    pub fn set_game_state(&mut self, target: GameState) {
        self.push(GameStateCommand { target });
    }

    /// Pending commands.
    #[must_use]
    pub fn as_slice(&self) -> &[WorldCommand] {
        &self.commands
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drops every pending command. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.commands.len();
        self.commands.clear();
        dropped
    }

    /// Takes every pending command, leaving the buffer empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, WorldCommand> {
        self.commands.drain(..)
    }
}

/// World state the flush phase may mutate.
pub struct FlushContext<'a> {
    /// Entity storage.
    pub registry: &'a mut EntityRegistry,
    /// Pools of reusable objects.
    pub pools: &'a mut GameObjectPoolManager,
    /// Profiles and spawn execution.
    pub spawner: &'a SpawnManager,
    /// Game state machine.
    pub state: &'a mut GameStateManager,
    /// Events of the current frame.
    pub frame_events: &'a mut FrameEvents,
    /// Events for the next frame.
    pub delayed_events: &'a mut DelayedEventQueue,
    /// Level extents handed to placers.
    pub level_bounds: Aabb,
}

/// What a flush did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlushReport {
    /// Objects spawned, singly or by plans.
    pub spawned: usize,
    /// Objects returned to their pools.
    pub despawned: usize,
    /// Spawn plans executed.
    pub plans_executed: usize,
    /// Despawns of unknown or already inactive objects.
    pub stale_despawns: usize,
    /// Requested spawns skipped for lack of pool capacity.
    pub exhausted: usize,
    /// Game state transitions applied.
    pub state_changes: usize,
    /// Commands dropped as unroutable or rejected.
    pub errors: Vec<CommandError>,
}

impl FlushReport {
    /// True when no command was dropped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
