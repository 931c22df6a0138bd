//! Routes drained commands to their handlers and flushes them in phase
//! order.

use std::collections::HashMap;

use kestrel_core::{EntityRegistry, SpawnProfileId};
use tracing::{debug, warn};

use super::handler::{CommandHandler, GameStateCommandHandler, SpawnCommandHandler};
use super::{CommandBuffer, CommandKind, FlushContext, FlushReport, WorldCommand};
use crate::error::{CommandError, CommandResult, EngineResult, SpawnResult};

/// Index of a spawn handler inside a dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpawnHandlerId(usize);

/// Owns the command handlers and the routing tables.
///
/// Spawn, despawn and plan commands are routed by spawn profile; a despawn
/// finds its profile through the entity it names. Game state commands go
/// to the single state handler.
#[derive(Debug, Default)]
pub struct WorldCommandDispatcher {
    spawn_handlers: Vec<SpawnCommandHandler>,
    profile_routes: HashMap<SpawnProfileId, SpawnHandlerId>,
    state_handler: Option<GameStateCommandHandler>,
}

impl WorldCommandDispatcher {
    /// Dispatcher without handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spawn handler.
    pub fn add_spawn_handler(&mut self, handler: SpawnCommandHandler) -> SpawnHandlerId {
        self.spawn_handlers.push(handler);
        SpawnHandlerId(self.spawn_handlers.len() - 1)
    }

    /// Routes commands for `profile` to `handler`, replacing any previous
    /// route. Returns `false` for an unknown handler.
    pub fn route_profile(&mut self, profile: SpawnProfileId, handler: SpawnHandlerId) -> bool {
        if handler.0 >= self.spawn_handlers.len() {
            return false;
        }
        self.profile_routes.insert(profile, handler);
        true
    }

    /// Whether `profile` has a route.
    #[must_use]
    pub fn is_routed(&self, profile: SpawnProfileId) -> bool {
        self.profile_routes.contains_key(&profile)
    }

    /// Installs the game state handler.
    pub fn set_state_handler(&mut self, handler: GameStateCommandHandler) {
        self.state_handler = Some(handler);
    }

    /// Drains `buffer`, routes every command and flushes all handlers:
    /// despawns of every handler, then spawns, then plans, then state.
    ///
    /// Unroutable commands are logged, recorded in the report and dropped.
    ///
    /// # Errors
    ///
    /// A spawn failure other than pool exhaustion. Commands already applied
    /// stay applied; every command still queued in any handler is
    /// discarded, so nothing leaks into a later flush.
    pub fn flush(&mut self, buffer: &mut CommandBuffer, ctx: &mut FlushContext<'_>) -> EngineResult<FlushReport> {
        let mut report = FlushReport::default();

        for command in buffer.drain() {
            if let Err(error) = self.route(command, ctx.registry, &mut report) {
                warn!(%error, "command dropped");
                report.errors.push(error);
            }
        }

        if let Err(error) = self.flush_handlers(ctx, &mut report) {
            let discarded = self.discard_pending();
            warn!(
                %error,
                spawned = report.spawned,
                despawned = report.despawned,
                discarded,
                "flush aborted"
            );
            return Err(error.into());
        }

        if report.spawned + report.despawned + report.state_changes > 0 {
            debug!(
                spawned = report.spawned,
                despawned = report.despawned,
                plans = report.plans_executed,
                state_changes = report.state_changes,
                "commands flushed"
            );
        }
        Ok(report)
    }

    /// Commands queued in handlers and not yet flushed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let spawn: usize = self.spawn_handlers.iter().map(SpawnCommandHandler::pending_count).sum();
        spawn + self.state_handler.as_ref().map_or(0, GameStateCommandHandler::pending_count)
    }

    fn flush_handlers(&mut self, ctx: &mut FlushContext<'_>, report: &mut FlushReport) -> SpawnResult<()> {
        for handler in &mut self.spawn_handlers {
            handler.flush_despawns(ctx, report);
        }
        for handler in &mut self.spawn_handlers {
            handler.flush_spawns(ctx, report)?;
        }
        for handler in &mut self.spawn_handlers {
            handler.flush_plans(ctx, report)?;
        }
        if let Some(handler) = &mut self.state_handler {
            handler.flush(ctx, report);
        }
        Ok(())
    }

    fn discard_pending(&mut self) -> usize {
        let spawn: usize = self.spawn_handlers.iter_mut().map(SpawnCommandHandler::discard).sum();
        spawn + self.state_handler.as_mut().map_or(0, GameStateCommandHandler::discard)
    }

    fn route(
        &mut self,
        command: WorldCommand,
        registry: &EntityRegistry,
        report: &mut FlushReport,
    ) -> CommandResult<()> {
        match command {
            WorldCommand::Spawn(spawn) => {
                self.spawn_handler(spawn.profile, CommandKind::Spawn)?.submit(spawn);
            }
            WorldCommand::ScheduledSpawnPlan(plan) => {
                self.spawn_handler(plan.profile, CommandKind::ScheduledSpawnPlan)?.submit(plan);
            }
            WorldCommand::Despawn(despawn) => {
                let Some(handle) = registry.handle_of(despawn.guid) else {
                    debug!(guid = %despawn.guid, "despawn of unknown object ignored");
                    report.stale_despawns += 1;
                    return Ok(());
                };
                let Some(profile) = registry.spawn_profile_of(handle) else {
                    return Err(CommandError::Unrouted {
                        command: CommandKind::Despawn,
                        target: despawn.guid.to_string(),
                    });
                };
                self.spawn_handler(profile, CommandKind::Despawn)?.submit(despawn);
            }
            WorldCommand::GameState(state) => {
                let handler = self.state_handler.as_mut().ok_or_else(|| CommandError::Unrouted {
                    command: CommandKind::GameState,
                    target: format!("{:?}", state.target),
                })?;
                handler.submit(state);
            }
        }
        Ok(())
    }

    fn spawn_handler(
        &mut self,
        profile: SpawnProfileId,
        command: CommandKind,
    ) -> CommandResult<&mut SpawnCommandHandler> {
        self.profile_routes
            .get(&profile)
            .and_then(|id| self.spawn_handlers.get_mut(id.0))
            .ok_or_else(|| CommandError::Unrouted {
                command,
                target: profile.to_string(),
            })
    }
}
