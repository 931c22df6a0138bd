//! # Game Objects
//!
//! A game object is an entity seen through its game-level state: GUID,
//! active flag, owning pool and originating spawn profile. [`GameObject`]
//! reads that state; [`GameObjectMut`] also edits it and the entity's
//! components.

use std::fmt;

use super::component::Component;
use super::entity::{Entity, EntityHandle, EntityRecord, Guid};
use super::registry::{ComponentRef, EntityRegistry};
use crate::error::EcsResult;

/// Identifier of a game object pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectPoolId(pub u32);

impl fmt::Display for GameObjectPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Identifier of a spawn profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnProfileId(pub u32);

impl fmt::Display for SpawnProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile#{}", self.0)
    }
}

/// Read-only facade over a live entity.
#[derive(Clone, Copy)]
pub struct GameObject<'w> {
    registry: &'w EntityRegistry,
    record: &'w EntityRecord,
}

impl<'w> GameObject<'w> {
    pub(crate) fn new(registry: &'w EntityRegistry, record: &'w EntityRecord) -> Self {
        Self { registry, record }
    }

    /// Stable identity.
    #[inline]
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.record.guid
    }

    /// Slot handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.record.handle
    }

    /// Handle and GUID together.
    #[inline]
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.record.entity()
    }

    /// Whether the object participates in systems.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.record.active
    }

    /// Pool that owns the object.
    #[must_use]
    pub fn pool_id(&self) -> Option<GameObjectPoolId> {
        self.record.pool
    }

    /// Profile that last spawned the object.
    #[must_use]
    pub fn spawn_profile(&self) -> Option<SpawnProfileId> {
        self.record.spawn_profile
    }

    /// Whether the object has a `T` component.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.registry.has::<T>(self.record.handle)
    }

    /// Borrows a component.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::get`].
    pub fn get<T: Component>(&self) -> EcsResult<ComponentRef<'w, T>> {
        self.registry.get::<T>(self.record.handle)
    }
}

impl fmt::Debug for GameObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("guid", &self.record.guid)
            .field("handle", &self.record.handle)
            .field("active", &self.record.active)
            .field("pool", &self.record.pool)
            .field("spawn_profile", &self.record.spawn_profile)
            .finish()
    }
}

/// Mutable facade over a live entity.
///
/// Holds the registry exclusively, so the entity cannot be destroyed from
/// elsewhere while the facade lives.
pub struct GameObjectMut<'w> {
    registry: &'w mut EntityRegistry,
    handle: EntityHandle,
}

impl<'w> GameObjectMut<'w> {
    pub(crate) fn new(registry: &'w mut EntityRegistry, handle: EntityHandle) -> Self {
        Self { registry, handle }
    }

    fn record(&self) -> &EntityRecord {
        &self.registry.records()[self.handle.entity_id() as usize]
    }

    /// Stable identity.
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.record().guid
    }

    /// Slot handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Whether the object participates in systems.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.record().active
    }

    /// Sets the active flag.
    pub fn set_active(&mut self, active: bool) {
        self.registry.set_active(self.handle, active);
    }

    /// Pool that owns the object.
    #[must_use]
    pub fn pool_id(&self) -> Option<GameObjectPoolId> {
        self.record().pool
    }

    /// Profile that last spawned the object.
    #[must_use]
    pub fn spawn_profile(&self) -> Option<SpawnProfileId> {
        self.record().spawn_profile
    }

    /// Tags the object with the profile that spawned it.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::set_spawn_profile`].
    pub fn set_spawn_profile(&mut self, profile: Option<SpawnProfileId>) -> EcsResult<()> {
        self.registry.set_spawn_profile(self.handle, profile)
    }

    /// Whether the object has a `T` component.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.registry.has::<T>(self.handle)
    }

    /// Borrows a component.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::get`].
    pub fn get<T: Component>(&self) -> EcsResult<ComponentRef<'_, T>> {
        self.registry.get::<T>(self.handle)
    }

    /// Exclusive access to a component.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::component_mut`].
    pub fn get_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.registry.component_mut::<T>(self.handle)
    }

    /// Adds or overwrites a component, returning the previous value.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::insert`].
    pub fn add<T: Component>(&mut self, value: T) -> EcsResult<Option<T>> {
        self.registry.insert(self.handle, value)
    }

    /// Removes a component, returning it if present.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::remove`].
    pub fn remove<T: Component>(&mut self) -> EcsResult<Option<T>> {
        self.registry.remove::<T>(self.handle)
    }

    /// Enables or disables one component.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::set_component_enabled`].
    pub fn set_component_enabled<T: Component>(&mut self, enabled: bool) -> EcsResult<()> {
        self.registry.set_component_enabled::<T>(self.handle, enabled)
    }

    /// Read-only view of the same object.
    #[must_use]
    pub fn as_game_object(&self) -> GameObject<'_> {
        GameObject::new(self.registry, self.record())
    }
}

impl fmt::Debug for GameObjectMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObjectMut")
            .field("guid", &self.guid())
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Velocity;
    use kestrel_shared::{Transform, Vec3};

    #[test]
    fn test_game_object_mut_edits_components_and_flags() {
        let mut registry = EntityRegistry::new(3);
        registry.register_component::<Transform>().unwrap();
        registry.register_component::<Velocity>().unwrap();
        let handle = registry.create();

        {
            let mut object = registry.game_object_mut(handle).unwrap();
            object.add(Transform::IDENTITY).unwrap();
            object.get_mut::<Transform>().unwrap().position = Vec3::Z;
            object.set_active(false);
            object.set_spawn_profile(Some(SpawnProfileId(4))).unwrap();
            assert!(object.has::<Transform>());
            assert!(!object.has::<Velocity>());
        }

        let object = registry.game_object(handle).unwrap();
        assert!(!object.is_active());
        assert_eq!(object.spawn_profile(), Some(SpawnProfileId(4)));
        assert_eq!(object.pool_id(), None);
        assert_eq!(object.get::<Transform>().unwrap().position, Vec3::Z);
        assert_eq!(registry.game_object_by_guid(object.guid()).map(|o| o.handle()), Some(handle));
    }

    #[test]
    fn test_dead_entity_has_no_game_object() {
        let mut registry = EntityRegistry::new(3);
        let handle = registry.create();
        registry.destroy(handle);
        assert!(registry.game_object(handle).is_none());
        assert!(registry.game_object_mut(handle).is_err());
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(GameObjectPoolId(2).to_string(), "pool#2");
        assert_eq!(SpawnProfileId(9).to_string(), "profile#9");
    }
}
