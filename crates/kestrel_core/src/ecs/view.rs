//! # Views
//!
//! A view is a query over every entity holding a set of component types.
//!
//! Iteration is driven by the smallest participating column: its dense
//! entity list is walked and every other column is probed by entity id.
//! Each term borrows its whole column for the lifetime of the view, so
//! `(&mut A, &A)` in one query is a [`EcsError::BorrowConflict`], never
//! undefined behavior.
//!
//! Views iterate values only. Creating or destroying entities, or adding
//! and removing components, needs `&mut EntityRegistry` and must be queued
//! as a command.
//!
//! [`EcsError::BorrowConflict`]: crate::error::EcsError::BorrowConflict

use std::ops::BitOr;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::component::{Component, ComponentTypeId};
use super::entity::{Entity, EntityHandle, EntityRecord};
use super::registry::EntityRegistry;
use super::sparse_set::SparseSet;
use crate::error::EcsResult;

/// Entity-level filters applied on top of component membership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ViewFilter(u8);

impl ViewFilter {
    /// Every entity holding the components.
    pub const NONE: Self = Self(0);
    /// Only active game objects.
    pub const ACTIVE: Self = Self(1);
    /// Only entities whose queried components are all enabled.
    pub const ENABLED: Self = Self(1 << 1);

    /// Whether every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ViewFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One component access in a query: `&T` or `&mut T`.
pub trait QueryTerm {
    /// Borrowed column.
    type Column<'w>;
    /// Per-entity item handed to the iteration callback.
    type Item<'c>;

    /// Registered id of the term's component.
    ///
    /// # Errors
    ///
    /// The component type is unregistered.
    fn component_type(registry: &EntityRegistry) -> EcsResult<ComponentTypeId>;

    /// Borrows the term's column.
    ///
    /// # Errors
    ///
    /// Unregistered type, or the column is borrowed incompatibly.
    fn borrow(registry: &EntityRegistry) -> EcsResult<Self::Column<'_>>;

    /// Number of components in the column.
    fn len(column: &Self::Column<'_>) -> usize;

    /// Entity id at a dense index of the column.
    fn entity_at(column: &Self::Column<'_>, dense_index: usize) -> Option<u32>;

    /// Whether the column holds a component for `entity_id`.
    fn contains(column: &Self::Column<'_>, entity_id: u32) -> bool;

    /// Fetches the item for `entity_id`.
    fn fetch<'c, 'w: 'c>(column: &'c mut Self::Column<'w>, entity_id: u32) -> Option<Self::Item<'c>>;
}

impl<'a, T: Component> QueryTerm for &'a T {
    type Column<'w> = RwLockReadGuard<'w, SparseSet<T>>;
    type Item<'c> = &'c T;

    fn component_type(registry: &EntityRegistry) -> EcsResult<ComponentTypeId> {
        registry.component_type::<T>()
    }

    fn borrow(registry: &EntityRegistry) -> EcsResult<Self::Column<'_>> {
        registry.read_column::<T>()
    }

    #[inline]
    fn len(column: &Self::Column<'_>) -> usize {
        column.len()
    }

    #[inline]
    fn entity_at(column: &Self::Column<'_>, dense_index: usize) -> Option<u32> {
        column.entity_at(dense_index)
    }

    #[inline]
    fn contains(column: &Self::Column<'_>, entity_id: u32) -> bool {
        column.contains(entity_id)
    }

    #[inline]
    fn fetch<'c, 'w: 'c>(column: &'c mut Self::Column<'w>, entity_id: u32) -> Option<Self::Item<'c>> {
        column.get(entity_id)
    }
}

impl<'a, T: Component> QueryTerm for &'a mut T {
    type Column<'w> = RwLockWriteGuard<'w, SparseSet<T>>;
    type Item<'c> = &'c mut T;

    fn component_type(registry: &EntityRegistry) -> EcsResult<ComponentTypeId> {
        registry.component_type::<T>()
    }

    fn borrow(registry: &EntityRegistry) -> EcsResult<Self::Column<'_>> {
        registry.write_column::<T>()
    }

    #[inline]
    fn len(column: &Self::Column<'_>) -> usize {
        column.len()
    }

    #[inline]
    fn entity_at(column: &Self::Column<'_>, dense_index: usize) -> Option<u32> {
        column.entity_at(dense_index)
    }

    #[inline]
    fn contains(column: &Self::Column<'_>, entity_id: u32) -> bool {
        column.contains(entity_id)
    }

    #[inline]
    fn fetch<'c, 'w: 'c>(column: &'c mut Self::Column<'w>, entity_id: u32) -> Option<Self::Item<'c>> {
        column.get_mut(entity_id)
    }
}

/// A tuple of [`QueryTerm`]s, implemented for arities one to six.
pub trait Query {
    /// Borrowed columns, one per term.
    type Columns<'w>;
    /// Tuple of per-entity items.
    type Item<'c>;

    /// Union of the terms' component bits.
    ///
    /// # Errors
    ///
    /// A component type is unregistered.
    fn mask(registry: &EntityRegistry) -> EcsResult<u64>;

    /// Borrows every column.
    ///
    /// # Errors
    ///
    /// Unregistered type, or a column is borrowed incompatibly.
    fn borrow(registry: &EntityRegistry) -> EcsResult<Self::Columns<'_>>;

    /// The smallest column as `(term index, length)`.
    fn driver(columns: &Self::Columns<'_>) -> (usize, usize);

    /// Entity id at `dense_index` of the column for `term`.
    fn entity_at(columns: &Self::Columns<'_>, term: usize, dense_index: usize) -> Option<u32>;

    /// Whether every column holds a component for `entity_id`.
    fn contains_all(columns: &Self::Columns<'_>, entity_id: u32) -> bool;

    /// Fetches every item for `entity_id`.
    fn fetch<'c, 'w: 'c>(columns: &'c mut Self::Columns<'w>, entity_id: u32) -> Option<Self::Item<'c>>;
}

macro_rules! impl_query {
    ($(($term:ident, $column:ident)),+) => {
        impl<$($term: QueryTerm),+> Query for ($($term,)+) {
            type Columns<'w> = ($(<$term as QueryTerm>::Column<'w>,)+);
            type Item<'c> = ($(<$term as QueryTerm>::Item<'c>,)+);

            fn mask(registry: &EntityRegistry) -> EcsResult<u64> {
                let mut mask = 0;
                $( mask |= $term::component_type(registry)?.mask(); )+
                Ok(mask)
            }

            fn borrow(registry: &EntityRegistry) -> EcsResult<Self::Columns<'_>> {
                Ok(($($term::borrow(registry)?,)+))
            }

            #[allow(unused_assignments)]
            fn driver(columns: &Self::Columns<'_>) -> (usize, usize) {
                let ($($column,)+) = columns;
                let mut best = (0, usize::MAX);
                let mut term = 0;
                $(
                    let len = $term::len($column);
                    if len < best.1 {
                        best = (term, len);
                    }
                    term += 1;
                )+
                best
            }

            #[allow(unused_assignments)]
            fn entity_at(columns: &Self::Columns<'_>, term: usize, dense_index: usize) -> Option<u32> {
                let ($($column,)+) = columns;
                let mut index = 0;
                $(
                    if index == term {
                        return $term::entity_at($column, dense_index);
                    }
                    index += 1;
                )+
                None
            }

            #[inline]
            fn contains_all(columns: &Self::Columns<'_>, entity_id: u32) -> bool {
                let ($($column,)+) = columns;
                $( $term::contains($column, entity_id) )&&+
            }

            #[inline]
            fn fetch<'c, 'w: 'c>(columns: &'c mut Self::Columns<'w>, entity_id: u32) -> Option<Self::Item<'c>> {
                let ($($column,)+) = columns;
                Some(($($term::fetch($column, entity_id)?,)+))
            }
        }
    };
}

impl_query!((A, a));
impl_query!((A, a), (B, b));
impl_query!((A, a), (B, b), (C, c));
impl_query!((A, a), (B, b), (C, c), (D, d));
impl_query!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_query!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));

/// Borrowed query over a registry.
///
/// Built by [`EntityRegistry::find`]. Holds its column borrows until
/// dropped or consumed.
pub struct View<'w, Q: Query> {
    records: &'w [EntityRecord],
    columns: Q::Columns<'w>,
    query_mask: u64,
    filter: ViewFilter,
}

impl<'w, Q: Query> View<'w, Q> {
    pub(crate) fn new(registry: &'w EntityRegistry) -> EcsResult<Self> {
        let query_mask = Q::mask(registry)?;
        let columns = Q::borrow(registry)?;
        Ok(Self {
            records: registry.records(),
            columns,
            query_mask,
            filter: ViewFilter::NONE,
        })
    }

    /// Restricts the view with entity-level filters.
    #[must_use]
    pub fn with_filter(mut self, filter: ViewFilter) -> Self {
        self.filter = filter;
        self
    }

    fn admit(&self, entity_id: u32) -> Option<Entity> {
        let record = self.records.get(entity_id as usize)?;
        if !record.alive {
            return None;
        }
        if self.filter.contains(ViewFilter::ACTIVE) && !record.active {
            return None;
        }
        if self.filter.contains(ViewFilter::ENABLED) && record.disabled_mask & self.query_mask != 0
        {
            return None;
        }
        Some(record.entity())
    }

    /// Calls `f` once for every matching entity.
    ///
    /// Iteration order follows the smallest column's dense order and is
    /// otherwise unspecified.
    pub fn each<F>(mut self, mut f: F)
    where
        F: for<'c> FnMut(Entity, Q::Item<'c>),
    {
        let (driver, len) = Q::driver(&self.columns);
        for dense_index in 0..len {
            let Some(entity_id) = Q::entity_at(&self.columns, driver, dense_index) else {
                break;
            };
            let Some(entity) = self.admit(entity_id) else {
                continue;
            };
            if !Q::contains_all(&self.columns, entity_id) {
                continue;
            }
            if let Some(item) = Q::fetch(&mut self.columns, entity_id) {
                f(entity, item);
            }
        }
    }

    /// Collects every matching entity.
    #[must_use]
    pub fn entities(self) -> Vec<Entity> {
        let (driver, len) = Q::driver(&self.columns);
        (0..len)
            .filter_map(|dense_index| Q::entity_at(&self.columns, driver, dense_index))
            .filter(|&entity_id| Q::contains_all(&self.columns, entity_id))
            .filter_map(|entity_id| self.admit(entity_id))
            .collect()
    }

    /// Handles of every matching entity.
    #[must_use]
    pub fn handles(self) -> Vec<EntityHandle> {
        self.entities().into_iter().map(|entity| entity.handle).collect()
    }

    /// First matching entity in iteration order.
    #[must_use]
    pub fn first(self) -> Option<Entity> {
        let (driver, len) = Q::driver(&self.columns);
        (0..len)
            .filter_map(|dense_index| Q::entity_at(&self.columns, driver, dense_index))
            .filter(|&entity_id| Q::contains_all(&self.columns, entity_id))
            .find_map(|entity_id| self.admit(entity_id))
    }

    /// Number of matching entities.
    #[must_use]
    pub fn count(self) -> usize {
        self.entities().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Velocity;
    use crate::error::EcsError;
    use kestrel_shared::{Transform, Vec3};
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::with_capacity(64, 11);
        registry.register_component::<Transform>().unwrap();
        registry.register_component::<Velocity>().unwrap();
        registry.register_component::<Health>().unwrap();
        registry
    }

    #[test]
    fn test_view_visits_only_entities_with_all_components() {
        let mut registry = registry();
        let both = registry.create();
        registry.insert(both, Transform::IDENTITY).unwrap();
        registry.insert(both, Velocity(Vec3::X)).unwrap();
        let only_transform = registry.create();
        registry.insert(only_transform, Transform::IDENTITY).unwrap();

        let mut seen = Vec::new();
        registry
            .find::<(&Transform, &Velocity)>()
            .unwrap()
            .each(|entity, (_, _)| seen.push(entity.handle));
        assert_eq!(seen, vec![both]);
    }

    #[test]
    fn test_view_mutates_values() {
        let mut registry = registry();
        for i in 0..4 {
            let e = registry.create();
            registry.insert(e, Transform::IDENTITY).unwrap();
            registry.insert(e, Velocity(Vec3::splat(i as f32))).unwrap();
        }

        registry
            .find::<(&mut Transform, &Velocity)>()
            .unwrap()
            .each(|_, (transform, velocity)| transform.position += velocity.0);

        let sum: f32 = registry
            .read_column::<Transform>()
            .unwrap()
            .iter()
            .map(|(_, t)| t.position.x)
            .sum();
        assert_eq!(sum, 0.0 + 1.0 + 2.0 + 3.0);
    }

    #[test]
    fn test_view_filters() {
        let mut registry = registry();
        let active = registry.create();
        let inactive = registry.create();
        let disabled = registry.create();
        for e in [active, inactive, disabled] {
            registry.insert(e, Health(10)).unwrap();
        }
        registry.set_active(inactive, false);
        registry.set_component_enabled::<Health>(disabled, false).unwrap();

        assert_eq!(registry.find::<(&Health,)>().unwrap().count(), 3);
        assert_eq!(
            registry
                .find::<(&Health,)>()
                .unwrap()
                .with_filter(ViewFilter::ACTIVE)
                .count(),
            2
        );
        let filtered = registry
            .find::<(&Health,)>()
            .unwrap()
            .with_filter(ViewFilter::ACTIVE | ViewFilter::ENABLED)
            .handles();
        assert_eq!(filtered, vec![active]);
        assert_eq!(
            registry
                .find::<(&Health,)>()
                .unwrap()
                .with_filter(ViewFilter::ACTIVE | ViewFilter::ENABLED)
                .first()
                .map(|e| e.handle),
            Some(active)
        );
    }

    #[test]
    fn test_conflicting_terms_are_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.find::<(&mut Health, &Health)>(),
            Err(EcsError::BorrowConflict(_))
        ));
        // Shared borrows of the same column are fine
        assert!(registry.find::<(&Health, &Health)>().is_ok());
    }

    #[test]
    fn test_unregistered_component_in_query() {
        struct Unknown;
        impl Component for Unknown {}

        let registry = registry();
        assert!(matches!(
            registry.find::<(&Unknown,)>(),
            Err(EcsError::UnregisteredComponent(_))
        ));
    }

    #[test]
    fn test_view_releases_borrows_when_consumed() {
        let mut registry = registry();
        let e = registry.create();
        registry.insert(e, Health(1)).unwrap();

        registry.find::<(&mut Health,)>().unwrap().each(|_, (h,)| h.0 += 1);
        assert_eq!(registry.get::<Health>(e).unwrap().0, 2);
    }

    proptest! {
        #[test]
        fn view_yields_exact_intersection(
            layout in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 1..48),
            kill in prop::collection::vec(any::<bool>(), 48),
        ) {
            let mut registry = registry();
            let mut expected = HashSet::new();

            for (i, &(has_t, has_v, has_h)) in layout.iter().enumerate() {
                let e = registry.create();
                if has_t { registry.insert(e, Transform::IDENTITY).unwrap(); }
                if has_v { registry.insert(e, Velocity::default()).unwrap(); }
                if has_h { registry.insert(e, Health(0)).unwrap(); }
                if kill[i] {
                    registry.destroy(e);
                } else if has_t && has_v && has_h {
                    expected.insert(e);
                }
            }

            let mut seen = HashSet::new();
            registry
                .find::<(&Transform, &mut Velocity, &Health)>()
                .unwrap()
                .each(|entity, _| assert!(seen.insert(entity.handle)));
            prop_assert_eq!(seen, expected);
        }
    }
}
