//! Despawning of objects that leave the level.

use kestrel_core::{Aabb, Transform, ViewFilter};

use crate::collision::AabbColliderComponent;
use crate::error::EngineResult;
use crate::game_loop::{System, UpdateContext};

/// Despawns spawned objects that left the level bounds grown by `margin`.
///
/// An object with an initialized collider is out once its world bounds no
/// longer touch the level; anything else is out once its position is.
#[derive(Clone, Copy, Debug, Default)]
pub struct LevelBoundsSystem {
    margin: f32,
}

impl LevelBoundsSystem {
    /// Creates the system. Negative margins shrink the level.
    #[must_use]
    pub const fn new(margin: f32) -> Self {
        Self { margin }
    }
}

impl System for LevelBoundsSystem {
    fn name(&self) -> &'static str {
        "level_bounds"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        let allowed = ctx.level_bounds.expand(self.margin);
        let registry = ctx.registry;
        let commands = &mut *ctx.commands;

        registry
            .find::<(&Transform,)>()?
            .with_filter(ViewFilter::ACTIVE)
            .each(|entity, (transform,)| {
                if registry.spawn_profile_of(entity.handle).is_none() {
                    return;
                }
                let collider_bounds = registry
                    .get::<AabbColliderComponent>(entity.handle)
                    .ok()
                    .and_then(|collider| collider.world_bounds());
                let outside = match collider_bounds {
                    Some(bounds) => is_disjoint(&allowed, &bounds),
                    None => !allowed.contains_point(transform.position),
                };
                if outside {
                    commands.despawn(entity.guid);
                }
            });
        Ok(())
    }
}

fn is_disjoint(a: &Aabb, b: &Aabb) -> bool {
    (0..3).any(|axis| b.max.axis(axis) < a.min.axis(axis) || b.min.axis(axis) > a.max.axis(axis))
}

#[cfg(test)]
mod tests {
    use kestrel_core::{SpawnProfileId, Vec3};

    use super::*;
    use crate::commands::WorldCommand;
    use crate::systems::harness::TestFrame;

    #[test]
    fn test_out_of_bounds_spawned_objects_despawn() {
        let mut frame = TestFrame::new();
        let mut spawn_at = |x: f32, spawned: bool| {
            let handle = frame.registry.create();
            frame
                .registry
                .insert(handle, Transform::from_position(Vec3::new(x, 0.0, 0.0)))
                .unwrap();
            if spawned {
                frame.registry.set_spawn_profile(handle, Some(SpawnProfileId(0))).unwrap();
            }
            frame.registry.guid_of(handle).unwrap()
        };
        let _inside = spawn_at(5.0, true);
        let _in_margin = spawn_at(11.0, true);
        let outside = spawn_at(13.0, true);
        let _scenery = spawn_at(50.0, false);

        frame.run(&mut LevelBoundsSystem::new(2.0), 0.016).unwrap();

        assert_eq!(frame.commands.len(), 1);
        assert!(matches!(
            frame.commands.as_slice()[0],
            WorldCommand::Despawn(command) if command.guid == outside
        ));
    }

    #[test]
    fn test_collider_bounds_decide_when_present() {
        let mut frame = TestFrame::new();
        let mut spawn_body = |x: f32| {
            let handle = frame.registry.create();
            let transform = Transform::from_position(Vec3::new(x, 0.0, 0.0));
            let mut collider = AabbColliderComponent::cube(2.0);
            collider.sync(&transform);
            frame.registry.insert(handle, transform).unwrap();
            frame.registry.insert(handle, collider).unwrap();
            frame.registry.set_spawn_profile(handle, Some(SpawnProfileId(0))).unwrap();
            frame.registry.guid_of(handle).unwrap()
        };
        // Center past the edge, body still overlapping
        let _straddling = spawn_body(13.0);
        let gone = spawn_body(15.0);

        frame.run(&mut LevelBoundsSystem::new(2.0), 0.016).unwrap();

        let despawned: Vec<_> = frame
            .commands
            .as_slice()
            .iter()
            .filter_map(|command| match command {
                WorldCommand::Despawn(command) => Some(command.guid),
                _ => None,
            })
            .collect();
        assert_eq!(despawned, vec![gone]);
    }
}
