//! # Entity Registry
//!
//! The central container for all entities and components. Owns one
//! [`SparseSet`] per registered component type.
//!
//! ## Mutation rules
//!
//! - Component *values* may be mutated through `&EntityRegistry`
//!   ([`EntityRegistry::get_mut`], views over `&mut T`)
//! - *Structural* changes (create, destroy, insert, remove, activate) require
//!   `&mut EntityRegistry`, which only the flush phase of a frame holds

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard,
};

use super::component::{Component, ComponentTypeId, ComponentTypes};
use super::entity::{Entity, EntityHandle, EntityRecord, Guid, GuidGenerator};
use super::game_object::{GameObject, GameObjectMut, GameObjectPoolId, SpawnProfileId};
use super::sparse_set::SparseSet;
use super::view::{Query, View};
use crate::error::{EcsError, EcsResult};

/// Shared borrow of a single component.
pub type ComponentRef<'a, T> = MappedRwLockReadGuard<'a, T>;

/// Exclusive borrow of a single component, obtained through a shared registry.
pub type ComponentMut<'a, T> = MappedRwLockWriteGuard<'a, T>;

/// Owns every entity slot and every component column.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = EntityRegistry::with_capacity(1024, 42);
/// registry.register_component::<Transform>()?;
///
/// let ship = registry.create();
/// registry.insert(ship, Transform::IDENTITY)?;
/// assert!(registry.destroy(ship));
/// assert!(!registry.is_alive(ship));
/// ```
pub struct EntityRegistry {
    records: Vec<EntityRecord>,
    free_ids: Vec<u32>,
    alive_count: usize,
    guid_index: HashMap<Guid, EntityHandle>,
    guids: GuidGenerator,
    types: ComponentTypes,
    capacity: usize,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(guid_seed: u64) -> Self {
        Self::with_capacity(0, guid_seed)
    }

    /// Creates a registry with storage reserved for `capacity` entities.
    ///
    /// The registry still grows past `capacity`; the reservation only avoids
    /// reallocation while the live count stays below it.
    #[must_use]
    pub fn with_capacity(capacity: usize, guid_seed: u64) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            free_ids: Vec::with_capacity(capacity),
            alive_count: 0,
            guid_index: HashMap::with_capacity(capacity),
            guids: GuidGenerator::new(guid_seed),
            types: ComponentTypes::new(),
            capacity,
        }
    }

    // =========================================================================
    // Component types
    // =========================================================================

    /// Registers a component type, returning its id.
    ///
    /// Registering the same type twice returns the existing id.
    ///
    /// # Errors
    ///
    /// [`EcsError::TooManyComponentTypes`] past 64 types.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.types.register::<T>(self.capacity)
    }

    /// Looks up the id of a registered component type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn component_type<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.types.id_of::<T>()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn component_type_count(&self) -> usize {
        self.types.len()
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Creates a new, active entity with a fresh GUID.
    pub fn create(&mut self) -> EntityHandle {
        let mut guid = self.guids.next_guid();
        while self.guid_index.contains_key(&guid) {
            guid = self.guids.next_guid();
        }
        self.allocate(guid)
    }

    /// Creates a new, active entity with a caller-chosen GUID.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateGuid`] if the GUID is nil or already in use.
    pub fn create_with_guid(&mut self, guid: Guid) -> EcsResult<EntityHandle> {
        if guid.is_nil() || self.guid_index.contains_key(&guid) {
            return Err(EcsError::DuplicateGuid(guid));
        }
        Ok(self.allocate(guid))
    }

    fn allocate(&mut self, guid: Guid) -> EntityHandle {
        let handle = if let Some(entity_id) = self.free_ids.pop() {
            let record = &mut self.records[entity_id as usize];
            let handle = EntityHandle::new(entity_id, record.handle.version_id());
            *record = EntityRecord::new(handle, guid);
            handle
        } else {
            let entity_id = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
            assert!(entity_id != u32::MAX, "entity id space exhausted");
            let handle = EntityHandle::new(entity_id, 0);
            self.records.push(EntityRecord::new(handle, guid));
            handle
        };

        self.guid_index.insert(guid, handle);
        self.alive_count += 1;
        handle
    }

    /// Destroys an entity, removing all its components and freeing its slot.
    ///
    /// The slot's version is incremented so outstanding handles go stale.
    ///
    /// # Returns
    ///
    /// `false` if the handle was already dead or stale.
    pub fn destroy(&mut self, handle: EntityHandle) -> bool {
        if !self.is_alive(handle) {
            return false;
        }

        let entity_id = handle.entity_id();
        let mask = self.records[entity_id as usize].component_mask;
        self.types.remove_all(entity_id, mask);

        let record = &mut self.records[entity_id as usize];
        self.guid_index.remove(&record.guid);
        let version = record.handle.version_id().wrapping_add(1);
        *record = EntityRecord {
            handle: EntityHandle::new(entity_id, version),
            guid: Guid::NIL,
            component_mask: 0,
            disabled_mask: 0,
            alive: false,
            active: false,
            pool: None,
            spawn_profile: None,
        };

        self.free_ids.push(entity_id);
        self.alive_count -= 1;
        true
    }

    /// Checks if a handle refers to a live entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        !handle.is_null()
            && self
                .records
                .get(handle.entity_id() as usize)
                .is_some_and(|record| record.alive && record.handle == handle)
    }

    pub(crate) fn record(&self, handle: EntityHandle) -> EcsResult<&EntityRecord> {
        if self.is_alive(handle) {
            Ok(&self.records[handle.entity_id() as usize])
        } else {
            Err(EcsError::StaleHandle(handle))
        }
    }

    pub(crate) fn record_mut(&mut self, handle: EntityHandle) -> EcsResult<&mut EntityRecord> {
        if self.is_alive(handle) {
            Ok(&mut self.records[handle.entity_id() as usize])
        } else {
            Err(EcsError::StaleHandle(handle))
        }
    }

    pub(crate) fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Resolves a GUID to its live handle in O(1).
    #[inline]
    #[must_use]
    pub fn handle_of(&self, guid: Guid) -> Option<EntityHandle> {
        self.guid_index.get(&guid).copied()
    }

    /// Returns the GUID of a live entity.
    #[inline]
    #[must_use]
    pub fn guid_of(&self, handle: EntityHandle) -> Option<Guid> {
        self.record(handle).ok().map(|record| record.guid)
    }

    /// Iterates over all alive entities.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records
            .iter()
            .filter(|record| record.alive)
            .map(EntityRecord::entity)
    }

    // =========================================================================
    // Game object flags
    // =========================================================================

    /// Whether the entity participates in systems. Dead handles are inactive.
    #[must_use]
    pub fn is_active(&self, handle: EntityHandle) -> bool {
        self.record(handle).is_ok_and(|record| record.active)
    }

    /// Sets the active flag. Returns `false` for a stale handle.
    pub fn set_active(&mut self, handle: EntityHandle, active: bool) -> bool {
        match self.record_mut(handle) {
            Ok(record) => {
                record.active = active;
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn set_pool(
        &mut self,
        handle: EntityHandle,
        pool: Option<GameObjectPoolId>,
    ) -> EcsResult<()> {
        self.record_mut(handle)?.pool = pool;
        Ok(())
    }

    /// Pool that owns the entity, if pooled.
    #[must_use]
    pub fn pool_of(&self, handle: EntityHandle) -> Option<GameObjectPoolId> {
        self.record(handle).ok().and_then(|record| record.pool)
    }

    /// Tags the entity with the profile that spawned it.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`] for a dead handle.
    pub fn set_spawn_profile(
        &mut self,
        handle: EntityHandle,
        profile: Option<SpawnProfileId>,
    ) -> EcsResult<()> {
        self.record_mut(handle)?.spawn_profile = profile;
        Ok(())
    }

    /// Profile that last spawned the entity.
    #[must_use]
    pub fn spawn_profile_of(&self, handle: EntityHandle) -> Option<SpawnProfileId> {
        self.record(handle).ok().and_then(|record| record.spawn_profile)
    }

    /// Enables or disables a single component of an entity.
    ///
    /// Disabled components are skipped by views filtered with
    /// [`ViewFilter::ENABLED`](super::ViewFilter::ENABLED).
    ///
    /// # Errors
    ///
    /// Stale handle, unregistered type, or the entity lacks the component.
    pub fn set_component_enabled<T: Component>(
        &mut self,
        handle: EntityHandle,
        enabled: bool,
    ) -> EcsResult<()> {
        let id = self.types.id_of::<T>()?;
        let record = self.record_mut(handle)?;
        if !record.has_component(id.bit()) {
            return Err(EcsError::MissingComponent {
                entity: handle,
                component: type_name::<T>(),
            });
        }
        if enabled {
            record.disabled_mask &= !id.mask();
        } else {
            record.disabled_mask |= id.mask();
        }
        Ok(())
    }

    /// Whether the entity has `T` and it is not individually disabled.
    #[must_use]
    pub fn is_component_enabled<T: Component>(&self, handle: EntityHandle) -> bool {
        let Ok(id) = self.types.id_of::<T>() else {
            return false;
        };
        self.record(handle).is_ok_and(|record| {
            record.has_component(id.bit()) && record.disabled_mask & id.mask() == 0
        })
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Inserts or overwrites a component. Returns the previous value.
    ///
    /// # Errors
    ///
    /// Stale handle or unregistered component type.
    pub fn insert<T: Component>(&mut self, handle: EntityHandle, value: T) -> EcsResult<Option<T>> {
        self.record(handle)?;
        let (id, set) = self.types.column_mut::<T>()?;
        let previous = set.insert(handle.entity_id(), value);
        self.records[handle.entity_id() as usize].add_component(id.bit());
        Ok(previous)
    }

    /// Removes a component, returning it if it was present.
    ///
    /// # Errors
    ///
    /// Stale handle or unregistered component type.
    pub fn remove<T: Component>(&mut self, handle: EntityHandle) -> EcsResult<Option<T>> {
        self.record(handle)?;
        let (id, set) = self.types.column_mut::<T>()?;
        let removed = set.remove(handle.entity_id());
        self.records[handle.entity_id() as usize].remove_component(id.bit());
        Ok(removed)
    }

    /// Whether a live entity has a component of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self, handle: EntityHandle) -> bool {
        let Ok(id) = self.types.id_of::<T>() else {
            return false;
        };
        self.record(handle)
            .is_ok_and(|record| record.has_component(id.bit()))
    }

    /// Borrows a component.
    ///
    /// # Errors
    ///
    /// Stale handle, unregistered type, missing component, or the column is
    /// mutably borrowed elsewhere.
    pub fn get<T: Component>(&self, handle: EntityHandle) -> EcsResult<ComponentRef<'_, T>> {
        self.record(handle)?;
        let guard = self.read_column::<T>()?;
        RwLockReadGuard::try_map(guard, |set| set.get(handle.entity_id())).map_err(|_| {
            EcsError::MissingComponent {
                entity: handle,
                component: type_name::<T>(),
            }
        })
    }

    /// Borrows a component mutably through a shared registry.
    ///
    /// # Errors
    ///
    /// Stale handle, unregistered type, missing component, or the column is
    /// borrowed elsewhere.
    pub fn get_mut<T: Component>(&self, handle: EntityHandle) -> EcsResult<ComponentMut<'_, T>> {
        self.record(handle)?;
        let guard = self.write_column::<T>()?;
        RwLockWriteGuard::try_map(guard, |set| set.get_mut(handle.entity_id())).map_err(|_| {
            EcsError::MissingComponent {
                entity: handle,
                component: type_name::<T>(),
            }
        })
    }

    /// Exclusive, lock-free access to a component.
    ///
    /// # Errors
    ///
    /// Stale handle, unregistered type or missing component.
    pub fn component_mut<T: Component>(&mut self, handle: EntityHandle) -> EcsResult<&mut T> {
        self.record(handle)?;
        let (_, set) = self.types.column_mut::<T>()?;
        set.get_mut(handle.entity_id())
            .ok_or(EcsError::MissingComponent {
                entity: handle,
                component: type_name::<T>(),
            })
    }

    /// Shared borrow of a whole component column.
    ///
    /// # Errors
    ///
    /// Unregistered type, or the column is mutably borrowed elsewhere.
    pub fn read_column<T: Component>(&self) -> EcsResult<RwLockReadGuard<'_, SparseSet<T>>> {
        self.types
            .column::<T>()?
            .set
            .try_read()
            .ok_or(EcsError::BorrowConflict(type_name::<T>()))
    }

    /// Exclusive borrow of a whole component column's values.
    ///
    /// # Errors
    ///
    /// Unregistered type, or the column is borrowed elsewhere.
    pub fn write_column<T: Component>(&self) -> EcsResult<RwLockWriteGuard<'_, SparseSet<T>>> {
        self.types
            .column::<T>()?
            .set
            .try_write()
            .ok_or(EcsError::BorrowConflict(type_name::<T>()))
    }

    // =========================================================================
    // Queries and facades
    // =========================================================================

    /// Builds a view over every entity holding all the components in `Q`.
    ///
    /// ```rust,ignore
    /// registry.find::<(&mut Transform, &Velocity)>()?
    ///     .with_filter(ViewFilter::ACTIVE)
    ///     .each(|_, (transform, velocity)| transform.position += velocity.0 * dt);
    /// ```
    ///
    /// # Errors
    ///
    /// Unregistered type, or a requested column is borrowed incompatibly.
    pub fn find<Q: Query>(&self) -> EcsResult<View<'_, Q>> {
        View::new(self)
    }

    /// Read-only facade over a live entity.
    #[must_use]
    pub fn game_object(&self, handle: EntityHandle) -> Option<GameObject<'_>> {
        self.record(handle)
            .ok()
            .map(|record| GameObject::new(self, record))
    }

    /// Read-only facade looked up by GUID.
    #[must_use]
    pub fn game_object_by_guid(&self, guid: Guid) -> Option<GameObject<'_>> {
        self.handle_of(guid).and_then(|handle| self.game_object(handle))
    }

    /// Mutable facade over a live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleHandle`] for a dead handle.
    pub fn game_object_mut(&mut self, handle: EntityHandle) -> EcsResult<GameObjectMut<'_>> {
        self.record(handle)?;
        Ok(GameObjectMut::new(self, handle))
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("alive_count", &self.alive_count)
            .field("slots", &self.records.len())
            .field("component_types", &self.types.type_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Velocity;
    use kestrel_shared::{Transform, Vec3};

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::with_capacity(16, 1);
        registry.register_component::<Transform>().unwrap();
        registry.register_component::<Velocity>().unwrap();
        registry
    }

    #[test]
    fn test_create_destroy() {
        let mut registry = registry();

        let a = registry.create();
        let b = registry.create();
        assert!(registry.is_alive(a));
        assert_eq!(registry.alive_count(), 2);

        assert!(registry.destroy(a));
        assert!(!registry.is_alive(a));
        assert!(registry.is_alive(b));
        assert_eq!(registry.alive_count(), 1);

        // Slot reuse with a bumped version
        let c = registry.create();
        assert_eq!(c.entity_id(), a.entity_id());
        assert_eq!(c.version_id(), a.version_id() + 1);
        assert!(!registry.is_alive(a));
    }

    #[test]
    fn test_double_destroy_is_rejected() {
        let mut registry = registry();
        let a = registry.create();
        assert!(registry.destroy(a));
        assert!(!registry.destroy(a));
        assert!(!registry.destroy(EntityHandle::NULL));
    }

    #[test]
    fn test_guid_index_follows_lifecycle() {
        let mut registry = registry();
        let a = registry.create();
        let guid = registry.guid_of(a).unwrap();
        assert_eq!(registry.handle_of(guid), Some(a));

        registry.destroy(a);
        assert_eq!(registry.handle_of(guid), None);
        assert_eq!(registry.guid_of(a), None);
    }

    #[test]
    fn test_create_with_duplicate_guid_fails() {
        let mut registry = registry();
        let guid = Guid::from_u128(77);
        registry.create_with_guid(guid).unwrap();
        assert_eq!(
            registry.create_with_guid(guid),
            Err(EcsError::DuplicateGuid(guid))
        );
        assert_eq!(
            registry.create_with_guid(Guid::NIL),
            Err(EcsError::DuplicateGuid(Guid::NIL))
        );
    }

    #[test]
    fn test_insert_get_remove() {
        let mut registry = registry();
        let a = registry.create();

        assert!(registry.insert(a, Transform::from_position(Vec3::X)).unwrap().is_none());
        assert!(registry.has::<Transform>(a));
        assert!(!registry.has::<Velocity>(a));
        assert_eq!(registry.get::<Transform>(a).unwrap().position, Vec3::X);

        registry.get_mut::<Transform>(a).unwrap().position = Vec3::Y;
        assert_eq!(registry.get::<Transform>(a).unwrap().position, Vec3::Y);

        let removed = registry.remove::<Transform>(a).unwrap().unwrap();
        assert_eq!(removed.position, Vec3::Y);
        assert!(!registry.has::<Transform>(a));
        assert!(matches!(
            registry.get::<Transform>(a),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_destroy_clears_components() {
        let mut registry = registry();
        let a = registry.create();
        registry.insert(a, Velocity(Vec3::ONE)).unwrap();
        registry.destroy(a);

        assert_eq!(registry.read_column::<Velocity>().unwrap().len(), 0);
        let b = registry.create();
        assert!(!registry.has::<Velocity>(b));
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut registry = registry();
        let a = registry.create();
        registry.destroy(a);
        let _reused = registry.create();

        assert_eq!(
            registry.insert(a, Velocity::default()),
            Err(EcsError::StaleHandle(a))
        );
        assert!(!registry.set_active(a, true));
    }

    #[test]
    fn test_unregistered_component() {
        #[derive(Debug)]
        struct Unknown;
        impl Component for Unknown {}

        let mut registry = registry();
        let a = registry.create();
        assert!(matches!(
            registry.insert(a, Unknown),
            Err(EcsError::UnregisteredComponent(_))
        ));
        assert!(!registry.has::<Unknown>(a));
    }

    #[test]
    fn test_borrow_conflict_is_an_error() {
        let mut registry = registry();
        let a = registry.create();
        registry.insert(a, Velocity::default()).unwrap();

        let held = registry.get_mut::<Velocity>(a).unwrap();
        assert!(matches!(
            registry.get::<Velocity>(a),
            Err(EcsError::BorrowConflict(_))
        ));
        drop(held);
        assert!(registry.get::<Velocity>(a).is_ok());
    }

    #[test]
    fn test_component_enabled_flags() {
        let mut registry = registry();
        let a = registry.create();
        assert!(registry.set_component_enabled::<Velocity>(a, false).is_err());

        registry.insert(a, Velocity::default()).unwrap();
        assert!(registry.is_component_enabled::<Velocity>(a));
        registry.set_component_enabled::<Velocity>(a, false).unwrap();
        assert!(!registry.is_component_enabled::<Velocity>(a));
        registry.set_component_enabled::<Velocity>(a, true).unwrap();
        assert!(registry.is_component_enabled::<Velocity>(a));
    }
}
