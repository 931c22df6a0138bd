//! Spawn initialization strategies.

use std::sync::Arc;

use kestrel_core::{EcsResult, GameObjectMut, Vec3, Velocity};

use super::profile::{SpawnContext, SpawnPlanCursor};
use crate::systems::Lifetime;

/// Prepares an acquired object's components before it is activated.
///
/// The object's transform already holds the placed position.
pub trait SpawnInitializer: Send + Sync {
    /// Initializes `object`.
    ///
    /// # Errors
    ///
    /// Component access failures; the spawn is then abandoned and the object
    /// returned to its pool.
    fn initialize(
        &self,
        object: &mut GameObjectMut<'_>,
        cursor: SpawnPlanCursor,
        context: &SpawnContext,
    ) -> EcsResult<()>;
}

/// Leaves the object as the pool prototype built it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInitializer;

impl SpawnInitializer for NoopInitializer {
    fn initialize(&self, _: &mut GameObjectMut<'_>, _: SpawnPlanCursor, _: &SpawnContext) -> EcsResult<()> {
        Ok(())
    }
}

/// Sets a constant velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityInitializer {
    /// Velocity assigned on spawn.
    pub velocity: Vec3,
}

impl SpawnInitializer for VelocityInitializer {
    fn initialize(&self, object: &mut GameObjectMut<'_>, _: SpawnPlanCursor, _: &SpawnContext) -> EcsResult<()> {
        object.add(Velocity(self.velocity))?;
        Ok(())
    }
}

/// Inherits the emitter's velocity and adds a launch impulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterVelocityInitializer {
    /// Launch direction, normalized on use.
    pub direction: Vec3,
    /// Launch speed along `direction`.
    pub speed: f32,
}

impl SpawnInitializer for EmitterVelocityInitializer {
    fn initialize(
        &self,
        object: &mut GameObjectMut<'_>,
        _: SpawnPlanCursor,
        context: &SpawnContext,
    ) -> EcsResult<()> {
        let inherited = context.emitter.map_or(Vec3::ZERO, |emitter| emitter.velocity);
        let launch = self.direction.normalize_or_zero() * self.speed;
        object.add(Velocity(inherited + launch))?;
        Ok(())
    }
}

/// Gives the object a fresh lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifetimeInitializer {
    /// Seconds until the object despawns.
    pub seconds: f32,
}

impl SpawnInitializer for LifetimeInitializer {
    fn initialize(&self, object: &mut GameObjectMut<'_>, _: SpawnPlanCursor, _: &SpawnContext) -> EcsResult<()> {
        object.add(Lifetime::new(self.seconds))?;
        Ok(())
    }
}

/// Runs several initializers in order, stopping at the first error.
#[derive(Clone, Default)]
pub struct InitializerChain {
    steps: Vec<Arc<dyn SpawnInitializer>>,
}

impl InitializerChain {
    /// Empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, step: impl SpawnInitializer + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }
}

impl std::fmt::Debug for InitializerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializerChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl SpawnInitializer for InitializerChain {
    fn initialize(
        &self,
        object: &mut GameObjectMut<'_>,
        cursor: SpawnPlanCursor,
        context: &SpawnContext,
    ) -> EcsResult<()> {
        for step in &self.steps {
            step.initialize(object, cursor, context)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::{EntityHandle, EntityRegistry};

    use super::*;

    fn registry() -> (EntityRegistry, EntityHandle) {
        let mut registry = EntityRegistry::new(5);
        registry.register_component::<Velocity>().unwrap();
        registry.register_component::<Lifetime>().unwrap();
        let handle = registry.create();
        (registry, handle)
    }

    #[test]
    fn test_emitter_velocity_inherits() {
        let (mut registry, handle) = registry();
        let init = EmitterVelocityInitializer {
            direction: Vec3::new(0.0, 0.0, 3.0),
            speed: 10.0,
        };
        let ctx = SpawnContext::from_emitter(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), EntityHandle::NULL);

        let mut object = registry.game_object_mut(handle).unwrap();
        init.initialize(&mut object, SpawnPlanCursor::SINGLE, &ctx).unwrap();
        assert_eq!(object.get_mut::<Velocity>().unwrap().0, Vec3::new(1.0, 0.0, 10.0));
    }

    #[test]
    fn test_chain_runs_every_step() {
        let (mut registry, handle) = registry();
        let chain = InitializerChain::new()
            .then(VelocityInitializer { velocity: Vec3::X })
            .then(LifetimeInitializer { seconds: 2.0 });

        let mut object = registry.game_object_mut(handle).unwrap();
        chain
            .initialize(&mut object, SpawnPlanCursor::SINGLE, &SpawnContext::default())
            .unwrap();
        assert!(object.has::<Velocity>());
        assert_eq!(object.get_mut::<Lifetime>().unwrap().remaining, 2.0);
    }

    #[test]
    fn test_chain_stops_on_error() {
        let mut registry = EntityRegistry::new(5);
        let handle = registry.create();
        let chain = InitializerChain::new().then(VelocityInitializer { velocity: Vec3::X });

        let mut object = registry.game_object_mut(handle).unwrap();
        assert!(chain
            .initialize(&mut object, SpawnPlanCursor::SINGLE, &SpawnContext::default())
            .is_err());
    }
}
