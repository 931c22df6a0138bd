//! # Spawn Manager
//!
//! Turns spawn commands into live objects:
//!
//! ```text
//! acquire from pool ──> place ──> initialize ──> tag profile ──> sync collider ──> activate
//!        │
//!        └── exhausted: skip (not an error)
//! ```
//!
//! Runs only during the flush phase, after every system has updated.

use std::sync::Arc;

use kestrel_core::{Aabb, EntityRegistry, Guid, PoolSlot, SpawnProfileId, Transform, Vec3};
use tracing::{debug, trace, warn};

use super::profile::{SpawnContext, SpawnPlanCursor, SpawnProfile, SpawnProfileRegistry};
use crate::collision::AabbColliderComponent;
use crate::commands::{
    DespawnCommand, FlushContext, FlushReport, ScheduledSpawnPlanCommand, SpawnCommand,
};
use crate::error::SpawnResult;
use crate::events::{GameEvent, SpawnPlanCommandExecutedEvent};

/// Owns the spawn profiles and executes spawn and despawn commands.
#[derive(Debug, Default)]
pub struct SpawnManager {
    profiles: SpawnProfileRegistry,
}

impl SpawnManager {
    /// Creates a manager without profiles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile.
    ///
    /// # Errors
    ///
    /// The id is already registered.
    pub fn register_profile(&mut self, profile: SpawnProfile) -> SpawnResult<()> {
        self.profiles.register(profile)
    }

    /// Looks a profile up.
    ///
    /// # Errors
    ///
    /// Unknown profile id.
    pub fn profile(&self, id: SpawnProfileId) -> SpawnResult<&Arc<SpawnProfile>> {
        self.profiles.get(id)
    }

    /// Registered profiles.
    #[must_use]
    pub fn profiles(&self) -> &SpawnProfileRegistry {
        &self.profiles
    }

    /// Spawns one object per command.
    ///
    /// # Errors
    ///
    /// Unknown profile or pool, or a failing initializer.
    pub fn spawn_objects(
        &self,
        commands: &[SpawnCommand],
        ctx: &mut FlushContext<'_>,
        report: &mut FlushReport,
    ) -> SpawnResult<()> {
        for command in commands {
            let profile = self.profiles.get(command.profile)?;
            match self.spawn_one(profile, SpawnPlanCursor::SINGLE, &command.context, ctx)? {
                Some(_) => report.spawned += 1,
                None => report.exhausted += 1,
            }
        }
        Ok(())
    }

    /// Executes batch spawn plans.
    ///
    /// Each plan spawns `min(amount, inactive objects)` and queues a
    /// [`SpawnPlanCommandExecutedEvent`] for the next frame with the number
    /// actually spawned.
    ///
    /// # Errors
    ///
    /// Unknown profile or pool, or a failing initializer.
    pub fn execute_scheduled_spawn_plan_commands(
        &self,
        commands: &[ScheduledSpawnPlanCommand],
        ctx: &mut FlushContext<'_>,
        report: &mut FlushReport,
    ) -> SpawnResult<()> {
        for command in commands {
            let profile = self.profiles.get(command.profile)?;
            let available = ctx.pools.inactive_count(profile.pool())?;
            let total = command.amount.min(available);

            let mut spawn_count = 0;
            for index in 0..total {
                let cursor = SpawnPlanCursor { total, index };
                if self.spawn_one(profile, cursor, &command.context, ctx)?.is_some() {
                    spawn_count += 1;
                }
            }
            if spawn_count < command.amount {
                report.exhausted += command.amount - spawn_count;
            }
            report.spawned += spawn_count;
            report.plans_executed += 1;

            debug!(
                rule = %command.rule,
                profile = %command.profile,
                requested = command.amount,
                spawned = spawn_count,
                "spawn plan executed"
            );
            ctx.delayed_events.push(GameEvent::SpawnPlanCommandExecuted(
                SpawnPlanCommandExecutedEvent {
                    rule: command.rule,
                    spawn_count,
                },
            ));
        }
        Ok(())
    }

    /// Returns objects to their pools.
    ///
    /// Unknown, inactive and already released GUIDs are counted as stale.
    pub fn despawn_objects(
        &self,
        commands: &[DespawnCommand],
        ctx: &mut FlushContext<'_>,
        report: &mut FlushReport,
    ) {
        for command in commands {
            let profile = ctx
                .registry
                .handle_of(command.guid)
                .and_then(|handle| ctx.registry.spawn_profile_of(handle));

            if ctx.pools.release(ctx.registry, command.guid) {
                report.despawned += 1;
                ctx.frame_events.push(GameEvent::EntityDespawned {
                    guid: command.guid,
                    profile,
                });
            } else {
                report.stale_despawns += 1;
                debug!(guid = %command.guid, "despawn ignored: object not active in any pool");
            }
        }
    }

    fn spawn_one(
        &self,
        profile: &SpawnProfile,
        cursor: SpawnPlanCursor,
        context: &SpawnContext,
        ctx: &mut FlushContext<'_>,
    ) -> SpawnResult<Option<Guid>> {
        let Some(slot) = ctx.pools.acquire(ctx.registry, profile.pool())? else {
            debug!(profile = %profile.id(), pool = %profile.pool(), "spawn skipped: pool exhausted");
            return Ok(None);
        };

        match Self::prepare(profile, slot, cursor, context, ctx.registry, ctx.level_bounds) {
            Ok(position) => {
                ctx.frame_events.push(GameEvent::EntitySpawned {
                    guid: slot.guid,
                    profile: profile.id(),
                    position,
                });
                trace!(guid = %slot.guid, profile = %profile.id(), "object spawned");
                Ok(Some(slot.guid))
            }
            Err(error) => {
                warn!(guid = %slot.guid, profile = %profile.id(), %error, "spawn failed; returning object to pool");
                ctx.pools.release(ctx.registry, slot.guid);
                Err(error)
            }
        }
    }

    /// Places, initializes, tags and activates an acquired object.
    fn prepare(
        profile: &SpawnProfile,
        slot: PoolSlot,
        cursor: SpawnPlanCursor,
        context: &SpawnContext,
        registry: &mut EntityRegistry,
        level_bounds: Aabb,
    ) -> SpawnResult<Vec3> {
        let mut transform = if registry.has::<Transform>(slot.handle) {
            *registry.component_mut::<Transform>(slot.handle)?
        } else {
            Transform::IDENTITY
        };
        let current_bounds = if registry.has::<AabbColliderComponent>(slot.handle) {
            registry.get::<AabbColliderComponent>(slot.handle)?.bounds_at(&transform)
        } else {
            Aabb::new(transform.position, transform.position)
        };

        transform.position =
            profile
                .placer()
                .position(slot.guid, &current_bounds, &level_bounds, cursor, context);

        let mut object = registry.game_object_mut(slot.handle)?;
        object.add(transform)?;
        profile.initializer().initialize(&mut object, cursor, context)?;
        object.set_spawn_profile(Some(profile.id()))?;
        if object.has::<AabbColliderComponent>() {
            object.get_mut::<AabbColliderComponent>()?.sync(&transform);
        }
        object.set_active(true);
        Ok(transform.position)
    }
}
