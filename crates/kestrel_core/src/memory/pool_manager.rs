//! # Pool Manager
//!
//! Ties pool bookkeeping to the entity registry: warms pools with real
//! entities, validates handles on acquire, and flips the active flag on
//! release.
//!
//! Pooled entities may be destroyed behind the manager's back. Such entries
//! are detected through their generation-checked handle and dropped from the
//! pool instead of being handed out.

use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use super::pool::{GameObjectPool, GameObjectPoolRegistry, PoolSlot, PoolStats};
use crate::ecs::{EntityRegistry, GameObjectMut, GameObjectPoolId, Guid};
use crate::error::{EcsResult, PoolError, PoolResult};

/// Owns every pool and knows which pool each pooled GUID belongs to.
#[derive(Debug, Default)]
pub struct GameObjectPoolManager {
    pools: GameObjectPoolRegistry,
    owners: HashMap<Guid, GameObjectPoolId>,
}

impl GameObjectPoolManager {
    /// Creates a manager with no pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and warms a pool of `size` inactive entities.
    ///
    /// `prototype` builds each entity's components. Warmed entities are
    /// inactive and tagged with the pool id.
    ///
    /// # Errors
    ///
    /// Duplicate id, zero size, or a prototype failure. On failure every
    /// entity created for the pool is destroyed again.
    pub fn create_pool<F>(
        &mut self,
        registry: &mut EntityRegistry,
        id: GameObjectPoolId,
        size: usize,
        mut prototype: F,
    ) -> PoolResult<()>
    where
        F: FnMut(&mut GameObjectMut<'_>) -> EcsResult<()>,
    {
        if self.pools.contains(id) {
            return Err(PoolError::DuplicatePool(id));
        }
        let mut pool = GameObjectPool::new(id, size)?;

        if let Err(error) = Self::warm(registry, &mut pool, &mut prototype) {
            for slot in pool.drain_inactive() {
                registry.destroy(slot.handle);
            }
            return Err(error);
        }

        for slot in pool.inactive_slots() {
            self.owners.insert(slot.guid, id);
        }
        self.pools.insert(pool)?;
        info!(pool = %id, size, "game object pool warmed");
        Ok(())
    }

    fn warm<F>(
        registry: &mut EntityRegistry,
        pool: &mut GameObjectPool,
        prototype: &mut F,
    ) -> PoolResult<()>
    where
        F: FnMut(&mut GameObjectMut<'_>) -> EcsResult<()>,
    {
        for _ in 0..pool.pool_size() {
            let handle = registry.create();
            let built = registry.game_object_mut(handle).and_then(|mut object| {
                prototype(&mut object)?;
                object.set_active(false);
                Ok(object.guid())
            });
            let guid = match built {
                Ok(guid) => guid,
                Err(error) => {
                    registry.destroy(handle);
                    return Err(error.into());
                }
            };
            registry.set_pool(handle, Some(pool.id()))?;
            pool.add_inactive(PoolSlot { guid, handle });
        }
        Ok(())
    }

    /// Acquires a live entity from a pool.
    ///
    /// The entity stays inactive; the caller positions and initializes it
    /// before activating. `Ok(None)` means the pool is exhausted.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolNotFound`] for an unknown id.
    pub fn acquire(
        &mut self,
        registry: &EntityRegistry,
        id: GameObjectPoolId,
    ) -> PoolResult<Option<PoolSlot>> {
        let pool = self.pools.get_mut(id).ok_or(PoolError::PoolNotFound(id))?;

        while let Some(slot) = pool.acquire() {
            if registry.is_alive(slot.handle) {
                trace!(pool = %id, guid = %slot.guid, "game object acquired");
                return Ok(Some(slot));
            }
            warn!(
                pool = %id,
                guid = %slot.guid,
                "pooled game object was destroyed externally; dropping it from the pool"
            );
            pool.release_and_remove(slot.guid);
            self.owners.remove(&slot.guid);
        }

        debug!(pool = %id, size = pool.pool_size(), "game object pool exhausted");
        Ok(None)
    }

    /// Returns an entity to its pool and deactivates it.
    ///
    /// Returns `false` if the GUID is not an active pooled entity, or if the
    /// entity was destroyed externally (its entry is then dropped).
    pub fn release(&mut self, registry: &mut EntityRegistry, guid: Guid) -> bool {
        let Some(&id) = self.owners.get(&guid) else {
            return false;
        };
        let Some(pool) = self.pools.get_mut(id) else {
            return false;
        };
        let Some(slot) = pool.active_slot(guid) else {
            return false;
        };

        if !registry.is_alive(slot.handle) {
            warn!(pool = %id, %guid, "released game object was destroyed externally");
            pool.release_and_remove(guid);
            self.owners.remove(&guid);
            return false;
        }

        pool.release(guid);
        registry.set_active(slot.handle, false);
        trace!(pool = %id, %guid, "game object released");
        true
    }

    /// Removes an active entity from its pool permanently and destroys it.
    ///
    /// Returns `false` if the GUID is not an active pooled entity.
    pub fn release_and_remove(&mut self, registry: &mut EntityRegistry, guid: Guid) -> bool {
        let Some(&id) = self.owners.get(&guid) else {
            return false;
        };
        let Some(pool) = self.pools.get_mut(id) else {
            return false;
        };
        let Some(slot) = pool.active_slot(guid) else {
            return false;
        };

        pool.release_and_remove(guid);
        self.owners.remove(&guid);
        registry.destroy(slot.handle);
        true
    }

    /// Pool that manages `guid`.
    #[must_use]
    pub fn owner_of(&self, guid: Guid) -> Option<GameObjectPoolId> {
        self.owners.get(&guid).copied()
    }

    /// Looks up a pool.
    #[must_use]
    pub fn pool(&self, id: GameObjectPoolId) -> Option<&GameObjectPool> {
        self.pools.get(id)
    }

    /// Inactive count of a pool.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolNotFound`] for an unknown id.
    pub fn inactive_count(&self, id: GameObjectPoolId) -> PoolResult<usize> {
        self.pools
            .get(id)
            .map(GameObjectPool::inactive_count)
            .ok_or(PoolError::PoolNotFound(id))
    }

    /// Occupancy snapshot of a pool.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolNotFound`] for an unknown id.
    pub fn stats(&self, id: GameObjectPoolId) -> PoolResult<PoolStats> {
        self.pools
            .get(id)
            .map(GameObjectPool::stats)
            .ok_or(PoolError::PoolNotFound(id))
    }

    /// All registered pools.
    #[must_use]
    pub fn pools(&self) -> &GameObjectPoolRegistry {
        &self.pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Velocity;
    use crate::error::EcsError;
    use kestrel_shared::{Transform, Vec3};

    const BULLETS: GameObjectPoolId = GameObjectPoolId(1);

    fn setup(size: usize) -> (EntityRegistry, GameObjectPoolManager) {
        let mut registry = EntityRegistry::with_capacity(32, 5);
        registry.register_component::<Transform>().unwrap();
        registry.register_component::<Velocity>().unwrap();
        let mut pools = GameObjectPoolManager::new();
        pools
            .create_pool(&mut registry, BULLETS, size, |object| {
                object.add(Transform::IDENTITY)?;
                object.add(Velocity(Vec3::X))?;
                Ok(())
            })
            .unwrap();
        (registry, pools)
    }

    #[test]
    fn test_warmup_creates_inactive_tagged_entities() {
        let (registry, pools) = setup(4);
        assert_eq!(registry.alive_count(), 4);
        assert_eq!(
            pools.stats(BULLETS).unwrap(),
            PoolStats { size: 4, active: 0, inactive: 4 }
        );
        for slot in pools.pool(BULLETS).unwrap().inactive_slots() {
            assert!(!registry.is_active(slot.handle));
            assert_eq!(registry.pool_of(slot.handle), Some(BULLETS));
            assert!(registry.has::<Velocity>(slot.handle));
            assert_eq!(pools.owner_of(slot.guid), Some(BULLETS));
        }
    }

    #[test]
    fn test_failed_prototype_rolls_back() {
        let mut registry = EntityRegistry::new(5);
        let mut pools = GameObjectPoolManager::new();
        let result = pools.create_pool(&mut registry, BULLETS, 3, |object| {
            object.add(Transform::IDENTITY).map(|_| ())
        });
        assert!(matches!(
            result,
            Err(PoolError::Ecs(EcsError::UnregisteredComponent(_)))
        ));
        assert_eq!(registry.alive_count(), 0);
        assert!(pools.pool(BULLETS).is_none());
    }

    #[test]
    fn test_acquire_release_cycle() {
        let (mut registry, mut pools) = setup(2);

        let slot = pools.acquire(&registry, BULLETS).unwrap().unwrap();
        assert_eq!(pools.inactive_count(BULLETS).unwrap(), 1);
        registry.set_active(slot.handle, true);

        assert!(pools.release(&mut registry, slot.guid));
        assert!(!registry.is_active(slot.handle));
        assert_eq!(pools.inactive_count(BULLETS).unwrap(), 2);
        assert!(!pools.release(&mut registry, slot.guid));
    }

    #[test]
    fn test_exhaustion_is_not_an_error() {
        let (registry, mut pools) = setup(1);
        assert!(pools.acquire(&registry, BULLETS).unwrap().is_some());
        assert_eq!(pools.acquire(&registry, BULLETS).unwrap(), None);
    }

    #[test]
    fn test_unknown_pool() {
        let (registry, mut pools) = setup(1);
        assert_eq!(
            pools.acquire(&registry, GameObjectPoolId(99)),
            Err(PoolError::PoolNotFound(GameObjectPoolId(99)))
        );
    }

    #[test]
    fn test_externally_destroyed_entries_are_skipped() {
        let (mut registry, mut pools) = setup(2);
        let doomed = *pools.pool(BULLETS).unwrap().inactive_slots().last().unwrap();
        registry.destroy(doomed.handle);

        let slot = pools.acquire(&registry, BULLETS).unwrap().unwrap();
        assert_ne!(slot.guid, doomed.guid);
        assert!(registry.is_alive(slot.handle));
        assert_eq!(pools.owner_of(doomed.guid), None);
        assert_eq!(pools.acquire(&registry, BULLETS).unwrap(), None);
    }

    #[test]
    fn test_release_of_externally_destroyed_entity_fails() {
        let (mut registry, mut pools) = setup(1);
        let slot = pools.acquire(&registry, BULLETS).unwrap().unwrap();
        registry.destroy(slot.handle);

        assert!(!pools.release(&mut registry, slot.guid));
        assert_eq!(pools.stats(BULLETS).unwrap().active, 0);
        assert_eq!(pools.stats(BULLETS).unwrap().inactive, 0);
    }

    #[test]
    fn test_release_and_remove_destroys_entity() {
        let (mut registry, mut pools) = setup(2);
        let slot = pools.acquire(&registry, BULLETS).unwrap().unwrap();

        assert!(pools.release_and_remove(&mut registry, slot.guid));
        assert!(!registry.is_alive(slot.handle));
        assert_eq!(pools.stats(BULLETS).unwrap().inactive, 1);
        assert!(!pools.release_and_remove(&mut registry, slot.guid));
        assert!(!pools.release(&mut registry, Guid::from_u128(1)));
    }
}
