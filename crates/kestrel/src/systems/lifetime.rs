//! Timed despawning.

use kestrel_core::{Component, ViewFilter};

use crate::error::EngineResult;
use crate::game_loop::{System, UpdateContext};

/// Remaining time before a spawned object despawns itself.
///
/// Objects reused from a pool keep their old, expired lifetime unless the
/// spawn profile gives them a new one with a `LifetimeInitializer`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lifetime {
    /// Seconds left.
    pub remaining: f32,
    /// Seconds granted at spawn.
    pub duration: f32,
}

impl Lifetime {
    /// Fresh lifetime of `seconds`.
    #[must_use]
    pub const fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds,
            duration: seconds,
        }
    }

    /// Whether the lifetime has run out.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

impl Component for Lifetime {}

/// Counts lifetimes down and despawns spawned objects when they expire.
///
/// The despawn is requested again every frame while an expired object is
/// still active, so a dropped request is retried.
#[derive(Clone, Copy, Debug, Default)]
pub struct LifetimeSystem;

impl System for LifetimeSystem {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        let dt = ctx.delta_time;
        let registry = ctx.registry;
        let commands = &mut *ctx.commands;

        registry
            .find::<(&mut Lifetime,)>()?
            .with_filter(ViewFilter::ACTIVE | ViewFilter::ENABLED)
            .each(|entity, (lifetime,)| {
                if !lifetime.is_expired() {
                    lifetime.remaining -= dt;
                }
                if lifetime.is_expired() && registry.spawn_profile_of(entity.handle).is_some() {
                    commands.despawn(entity.guid);
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::SpawnProfileId;

    use super::*;
    use crate::commands::{DespawnCommand, WorldCommand};
    use crate::systems::harness::TestFrame;

    #[test]
    fn test_expiry_despawns_until_inactive() {
        let mut frame = TestFrame::new();
        let handle = frame.registry.create();
        frame.registry.insert(handle, Lifetime::new(1.0)).unwrap();
        frame.registry.set_spawn_profile(handle, Some(SpawnProfileId(1))).unwrap();
        let guid = frame.registry.guid_of(handle).unwrap();

        frame.run(&mut LifetimeSystem, 0.6).unwrap();
        assert!(frame.commands.is_empty());

        frame.run(&mut LifetimeSystem, 0.6).unwrap();
        assert_eq!(frame.commands.as_slice(), &[WorldCommand::Despawn(DespawnCommand { guid })]);

        // Still active: the request is repeated
        frame.run(&mut LifetimeSystem, 0.6).unwrap();
        assert_eq!(frame.commands.len(), 2);
        assert!(frame.registry.get::<Lifetime>(handle).unwrap().remaining > -0.3);

        frame.registry.set_active(handle, false);
        frame.run(&mut LifetimeSystem, 0.6).unwrap();
        assert_eq!(frame.commands.len(), 2);
    }

    #[test]
    fn test_unspawned_objects_just_expire() {
        let mut frame = TestFrame::new();
        let handle = frame.registry.create();
        frame.registry.insert(handle, Lifetime::new(0.1)).unwrap();

        frame.run(&mut LifetimeSystem, 0.5).unwrap();
        assert!(frame.commands.is_empty());
        assert!(frame.registry.get::<Lifetime>(handle).unwrap().is_expired());
    }
}
