//! Command handlers.
//!
//! Handlers only queue on `submit`; work happens when the dispatcher
//! flushes them.

use tracing::warn;

use super::{
    DespawnCommand, FlushContext, FlushReport, GameStateCommand, ScheduledSpawnPlanCommand,
    SpawnCommand,
};
use crate::error::SpawnResult;
use crate::events::GameEvent;

/// Accepts commands of type `C` for a later flush.
pub trait CommandHandler<C> {
    /// Queues a command.
    fn submit(&mut self, command: C);
}

/// Queues spawn-related commands for the profiles routed to it.
#[derive(Debug, Default)]
pub struct SpawnCommandHandler {
    despawns: Vec<DespawnCommand>,
    spawns: Vec<SpawnCommand>,
    plans: Vec<ScheduledSpawnPlanCommand>,
}

impl SpawnCommandHandler {
    /// Creates an idle handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued commands of every kind.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.despawns.len() + self.spawns.len() + self.plans.len()
    }

    /// Drops every queued command without executing it. Returns how many
    /// were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending_count();
        self.despawns.clear();
        self.spawns.clear();
        self.plans.clear();
        dropped
    }

    /// Executes queued despawns.
    pub fn flush_despawns(&mut self, ctx: &mut FlushContext<'_>, report: &mut FlushReport) {
        if self.despawns.is_empty() {
            return;
        }
        let spawner = ctx.spawner;
        spawner.despawn_objects(&self.despawns, ctx, report);
        self.despawns.clear();
    }

    /// Executes queued single spawns.
    ///
    /// # Errors
    ///
    /// See [`SpawnManager::spawn_objects`](crate::spawn::SpawnManager::spawn_objects).
    pub fn flush_spawns(&mut self, ctx: &mut FlushContext<'_>, report: &mut FlushReport) -> SpawnResult<()> {
        if self.spawns.is_empty() {
            return Ok(());
        }
        let spawner = ctx.spawner;
        let result = spawner.spawn_objects(&self.spawns, ctx, report);
        self.spawns.clear();
        result
    }

    /// Executes queued spawn plans.
    ///
    /// # Errors
    ///
    /// See [`SpawnManager::execute_scheduled_spawn_plan_commands`](crate::spawn::SpawnManager::execute_scheduled_spawn_plan_commands).
    pub fn flush_plans(&mut self, ctx: &mut FlushContext<'_>, report: &mut FlushReport) -> SpawnResult<()> {
        if self.plans.is_empty() {
            return Ok(());
        }
        let spawner = ctx.spawner;
        let result = spawner.execute_scheduled_spawn_plan_commands(&self.plans, ctx, report);
        self.plans.clear();
        result
    }

    /// Flushes despawns, then spawns, then plans.
    ///
    /// # Errors
    ///
    /// The first spawn failure.
    pub fn flush(&mut self, ctx: &mut FlushContext<'_>, report: &mut FlushReport) -> SpawnResult<()> {
        self.flush_despawns(ctx, report);
        self.flush_spawns(ctx, report)?;
        self.flush_plans(ctx, report)
    }
}

impl CommandHandler<SpawnCommand> for SpawnCommandHandler {
    fn submit(&mut self, command: SpawnCommand) {
        self.spawns.push(command);
    }
}

impl CommandHandler<DespawnCommand> for SpawnCommandHandler {
    fn submit(&mut self, command: DespawnCommand) {
        self.despawns.push(command);
    }
}

impl CommandHandler<ScheduledSpawnPlanCommand> for SpawnCommandHandler {
    fn submit(&mut self, command: ScheduledSpawnPlanCommand) {
        self.plans.push(command);
    }
}

/// Applies game state transitions in submission order.
#[derive(Debug, Default)]
pub struct GameStateCommandHandler {
    queue: Vec<GameStateCommand>,
}

impl GameStateCommandHandler {
    /// Creates an idle handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued transitions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Drops queued transitions. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// Applies queued transitions.
    ///
    /// Illegal transitions are logged and recorded in the report; later
    /// commands still run.
    pub fn flush(&mut self, ctx: &mut FlushContext<'_>, report: &mut FlushReport) {
        for command in self.queue.drain(..) {
            match ctx.state.transition(command.target) {
                Ok(Some(from)) => {
                    report.state_changes += 1;
                    ctx.frame_events.push(GameEvent::GameStateChanged {
                        from,
                        to: command.target,
                    });
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, "game state command rejected");
                    report.errors.push(error);
                }
            }
        }
    }
}

impl CommandHandler<GameStateCommand> for GameStateCommandHandler {
    fn submit(&mut self, command: GameStateCommand) {
        self.queue.push(command);
    }
}
