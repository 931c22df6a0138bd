//! # Sparse Set Storage
//!
//! Per-component-type storage keyed by entity id:
//! - `sparse[entity_id]` holds the dense index, or [`TOMBSTONE`]
//! - `dense` holds the components, packed
//! - `entities[i]` holds the entity id owning `dense[i]`
//!
//! Invariant: `sparse[entities[i]] == i` for every dense index `i`.
//!
//! Removal swaps the last element into the hole, so dense indices are not
//! stable across mutation. Iteration order is unspecified.

/// Sentinel marking an entity id with no component in this set.
pub const TOMBSTONE: usize = usize::MAX;

/// Dense component storage with O(1) insert, remove and membership test.
///
/// # Example
///
/// ```rust,ignore
/// let mut set: SparseSet<f32> = SparseSet::new();
/// set.insert(7, 1.5);
/// assert!(set.contains(7));
/// ```
#[derive(Clone, Debug)]
pub struct SparseSet<T> {
    sparse: Vec<usize>,
    dense: Vec<T>,
    entities: Vec<u32>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SparseSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Creates an empty set with room for `capacity` components and entity ids.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// True when no component is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    #[inline]
    fn dense_index(&self, entity_id: u32) -> Option<usize> {
        match self.sparse.get(entity_id as usize) {
            Some(&index) if index != TOMBSTONE => Some(index),
            _ => None,
        }
    }

    /// Checks whether `entity_id` has a component in this set.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity_id: u32) -> bool {
        self.dense_index(entity_id).is_some()
    }

    /// Inserts or overwrites the component for `entity_id`.
    ///
    /// Returns the previous value when overwriting.
    pub fn insert(&mut self, entity_id: u32, value: T) -> Option<T> {
        let slot = entity_id as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, TOMBSTONE);
        }

        if let Some(index) = self.dense_index(entity_id) {
            return Some(std::mem::replace(&mut self.dense[index], value));
        }

        self.sparse[slot] = self.dense.len();
        self.dense.push(value);
        self.entities.push(entity_id);
        None
    }

    /// Removes the component for `entity_id` via swap-and-pop.
    ///
    /// The last dense element moves into the freed index; no other entity's
    /// membership changes.
    pub fn remove(&mut self, entity_id: u32) -> Option<T> {
        let index = self.dense_index(entity_id)?;
        self.sparse[entity_id as usize] = TOMBSTONE;

        let value = self.dense.swap_remove(index);
        self.entities.swap_remove(index);

        if let Some(&moved) = self.entities.get(index) {
            self.sparse[moved as usize] = index;
        }

        Some(value)
    }

    /// Gets the component for `entity_id`.
    #[inline]
    #[must_use]
    pub fn get(&self, entity_id: u32) -> Option<&T> {
        self.dense_index(entity_id).map(|index| &self.dense[index])
    }

    /// Gets the component for `entity_id` mutably.
    #[inline]
    pub fn get_mut(&mut self, entity_id: u32) -> Option<&mut T> {
        let index = self.dense_index(entity_id)?;
        Some(&mut self.dense[index])
    }

    /// Entity id stored at a dense index.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, dense_index: usize) -> Option<u32> {
        self.entities.get(dense_index).copied()
    }

    /// Entity ids in dense order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[u32] {
        &self.entities
    }

    /// Components in dense order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// Components in dense order, mutably. Membership cannot change through this.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Iterates over all `(entity_id, component)` pairs in dense order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterates mutably over all `(entity_id, component)` pairs in dense order.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// Removes every component, keeping allocated capacity.
    pub fn clear(&mut self) {
        for &entity_id in &self.entities {
            self.sparse[entity_id as usize] = TOMBSTONE;
        }
        self.dense.clear();
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_consistent<T>(set: &SparseSet<T>) {
        assert_eq!(set.dense.len(), set.entities.len());
        for (index, &entity_id) in set.entities.iter().enumerate() {
            assert_eq!(set.sparse[entity_id as usize], index);
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut set = SparseSet::new();
        assert!(set.insert(10, "a").is_none());
        assert!(set.insert(3, "b").is_none());

        assert_eq!(set.get(10), Some(&"a"));
        assert_eq!(set.get(3), Some(&"b"));
        assert_eq!(set.get(4), None);
        assert_eq!(set.get(1000), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut set = SparseSet::new();
        set.insert(1, 10);
        assert_eq!(set.insert(1, 20), Some(10));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(1), Some(&20));
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut set = SparseSet::new();
        set.insert(0, 'a');
        set.insert(1, 'b');
        set.insert(2, 'c');

        assert_eq!(set.remove(0), Some('a'));
        assert!(!set.contains(0));
        assert_eq!(set.len(), 2);
        // 'c' moved into dense slot 0
        assert_eq!(set.entity_at(0), Some(2));
        assert_eq!(set.get(2), Some(&'c'));
        assert_eq!(set.get(1), Some(&'b'));
        assert_consistent(&set);
    }

    #[test]
    fn test_remove_last_and_missing() {
        let mut set = SparseSet::new();
        set.insert(5, 1u8);
        assert_eq!(set.remove(5), Some(1));
        assert_eq!(set.remove(5), None);
        assert_eq!(set.remove(99), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_clear_resets_membership() {
        let mut set = SparseSet::with_capacity(8);
        for id in 0..8 {
            set.insert(id, id * 2);
        }
        set.clear();
        assert!(set.is_empty());
        assert!((0..8).all(|id| !set.contains(id)));
        set.insert(4, 1);
        assert_consistent(&set);
    }

    proptest! {
        #[test]
        fn sparse_set_invariant_holds(ops in prop::collection::vec((any::<bool>(), 0u32..64, any::<i32>()), 0..200)) {
            let mut set = SparseSet::new();
            let mut model = std::collections::HashMap::new();

            for (insert, id, value) in ops {
                if insert {
                    set.insert(id, value);
                    model.insert(id, value);
                } else {
                    let before = set.len();
                    let removed = set.remove(id);
                    prop_assert_eq!(removed, model.remove(&id));
                    if removed.is_some() {
                        prop_assert_eq!(set.len(), before - 1);
                    }
                    prop_assert!(!set.contains(id));
                }
            }

            prop_assert_eq!(set.len(), model.len());
            for (id, value) in &model {
                prop_assert_eq!(set.get(*id), Some(value));
            }
            for (index, &entity_id) in set.entities().iter().enumerate() {
                prop_assert_eq!(set.sparse[entity_id as usize], index);
            }
        }
    }
}
