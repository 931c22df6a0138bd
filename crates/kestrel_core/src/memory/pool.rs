//! # Game Object Pool
//!
//! Fixed-size bookkeeping of reusable game objects.
//!
//! A pool never owns entities; it tracks slots (GUID + handle) that live in
//! the registry. Every managed slot is either active (handed out) or inactive
//! (available), never both.

use std::collections::HashMap;

use crate::ecs::{EntityHandle, GameObjectPoolId, Guid};
use crate::error::{PoolError, PoolResult};

/// A pooled game object reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolSlot {
    /// Stable identity of the pooled object.
    pub guid: Guid,
    /// Registry handle of the pooled object.
    pub handle: EntityHandle,
}

/// Snapshot of a pool's occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Capacity fixed at warmup.
    pub size: usize,
    /// Slots currently handed out.
    pub active: usize,
    /// Slots available to acquire.
    pub inactive: usize,
}

/// Active/inactive slot lists for one pool.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = GameObjectPool::new(GameObjectPoolId(0), 2)?;
/// pool.add_inactive(slot_a);
/// pool.add_inactive(slot_b);
///
/// let slot = pool.acquire().unwrap(); // slot_b, LIFO
/// assert!(pool.release(slot.guid));
/// assert!(!pool.release(slot.guid)); // double release rejected
/// ```
#[derive(Clone, Debug)]
pub struct GameObjectPool {
    id: GameObjectPoolId,
    pool_size: usize,
    active: Vec<PoolSlot>,
    inactive: Vec<PoolSlot>,
    /// Position of each active GUID in `active`.
    active_index: HashMap<Guid, usize>,
}

impl GameObjectPool {
    /// Creates an empty pool with room for `pool_size` slots.
    ///
    /// # Errors
    ///
    /// [`PoolError::EmptyPool`] for a zero size.
    pub fn new(id: GameObjectPoolId, pool_size: usize) -> PoolResult<Self> {
        if pool_size == 0 {
            return Err(PoolError::EmptyPool(id));
        }
        Ok(Self {
            id,
            pool_size,
            active: Vec::with_capacity(pool_size),
            inactive: Vec::with_capacity(pool_size),
            active_index: HashMap::with_capacity(pool_size),
        })
    }

    /// Pool identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> GameObjectPoolId {
        self.id
    }

    /// Capacity fixed at construction.
    #[inline]
    #[must_use]
    pub const fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of slots handed out.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of slots available.
    #[inline]
    #[must_use]
    pub fn inactive_count(&self) -> usize {
        self.inactive.len()
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool_size,
            active: self.active.len(),
            inactive: self.inactive.len(),
        }
    }

    /// Adds a warmed slot to the inactive list.
    ///
    /// Returns `false` if the pool is already full.
    pub fn add_inactive(&mut self, slot: PoolSlot) -> bool {
        if self.active.len() + self.inactive.len() >= self.pool_size {
            return false;
        }
        self.inactive.push(slot);
        true
    }

    /// Takes the most recently released slot (LIFO).
    ///
    /// `None` means the pool is exhausted. That is an expected condition.
    pub fn acquire(&mut self) -> Option<PoolSlot> {
        let slot = self.inactive.pop()?;
        self.active_index.insert(slot.guid, self.active.len());
        self.active.push(slot);
        Some(slot)
    }

    /// Returns an active slot to the inactive list.
    ///
    /// Returns `false` if `guid` is not currently active here.
    pub fn release(&mut self, guid: Guid) -> bool {
        match self.take_active(guid) {
            Some(slot) => {
                self.inactive.push(slot);
                true
            }
            None => false,
        }
    }

    /// Drops an active slot permanently.
    ///
    /// Returns `false` if `guid` is not currently active here.
    pub fn release_and_remove(&mut self, guid: Guid) -> bool {
        self.take_active(guid).is_some()
    }

    /// Active slot for `guid`, if handed out by this pool.
    #[must_use]
    pub fn active_slot(&self, guid: Guid) -> Option<PoolSlot> {
        self.active_index.get(&guid).map(|&index| self.active[index])
    }

    /// Whether `guid` is currently handed out by this pool.
    #[must_use]
    pub fn is_active(&self, guid: Guid) -> bool {
        self.active_index.contains_key(&guid)
    }

    /// Active slots in unspecified order.
    #[must_use]
    pub fn active_slots(&self) -> &[PoolSlot] {
        &self.active
    }

    /// Inactive slots; the last one is acquired next.
    #[must_use]
    pub fn inactive_slots(&self) -> &[PoolSlot] {
        &self.inactive
    }

    /// Removes `guid` from the active list, keeping it dense.
    fn take_active(&mut self, guid: Guid) -> Option<PoolSlot> {
        let index = self.active_index.remove(&guid)?;
        let slot = self.active.swap_remove(index);
        if let Some(moved) = self.active.get(index) {
            self.active_index.insert(moved.guid, index);
        }
        Some(slot)
    }

    pub(crate) fn drain_inactive(&mut self) -> std::vec::Drain<'_, PoolSlot> {
        self.inactive.drain(..)
    }
}

/// Pools by id.
#[derive(Clone, Debug, Default)]
pub struct GameObjectPoolRegistry {
    pools: HashMap<GameObjectPoolId, GameObjectPool>,
}

impl GameObjectPoolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool under its own id.
    ///
    /// # Errors
    ///
    /// [`PoolError::DuplicatePool`] if the id is taken.
    pub fn insert(&mut self, pool: GameObjectPool) -> PoolResult<()> {
        let id = pool.id();
        if self.pools.contains_key(&id) {
            return Err(PoolError::DuplicatePool(id));
        }
        self.pools.insert(id, pool);
        Ok(())
    }

    /// Whether a pool is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: GameObjectPoolId) -> bool {
        self.pools.contains_key(&id)
    }

    /// Looks up a pool.
    #[must_use]
    pub fn get(&self, id: GameObjectPoolId) -> Option<&GameObjectPool> {
        self.pools.get(&id)
    }

    /// Looks up a pool mutably.
    pub fn get_mut(&mut self, id: GameObjectPoolId) -> Option<&mut GameObjectPool> {
        self.pools.get_mut(&id)
    }

    /// Unregisters a pool.
    pub fn remove(&mut self, id: GameObjectPoolId) -> Option<GameObjectPool> {
        self.pools.remove(&id)
    }

    /// Number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// True when no pool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Iterates over all pools.
    pub fn iter(&self) -> impl Iterator<Item = &GameObjectPool> {
        self.pools.values()
    }
}
