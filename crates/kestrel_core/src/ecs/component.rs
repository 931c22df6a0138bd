//! # Component Types
//!
//! Components are plain data. Every component type is registered with the
//! registry at startup and receives a [`ComponentTypeId`] in registration
//! order, so ids are reproducible for a given program and never depend on
//! first-use order.
//!
//! Component type ids are process-local. Never persist them.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use bytemuck::{Pod, Zeroable};
use kestrel_shared::{Transform, Vec3};
use parking_lot::RwLock;

use super::sparse_set::SparseSet;
use crate::error::{EcsError, EcsResult};

/// Maximum number of registered component types (entity masks are `u64`).
pub const MAX_COMPONENT_TYPES: usize = 64;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: Send + Sync + 'static {}

impl Component for Transform {}

/// Linear velocity in world units per second.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Velocity(pub Vec3);

impl Component for Velocity {}

/// Slot index assigned to a component type at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u8);

impl ComponentTypeId {
    /// Position of this type in the registry (and bit in entity masks).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Bit of this type in entity component masks.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        self.0
    }

    /// Mask with only this type's bit set.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u64 {
        1 << self.0
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Type-erased view of a component column, used for structural operations
/// that do not know the concrete component type.
pub(crate) trait ErasedColumn: Send + Sync {
    /// Removes the entity's component, if present.
    fn remove_entity(&mut self, entity_id: u32) -> bool;

    /// Component type name for diagnostics.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// One sparse set per component type, behind a lock so views can borrow
/// distinct columns mutably through a shared registry.
pub(crate) struct Column<T: Component> {
    pub set: RwLock<SparseSet<T>>,
}

impl<T: Component> Column<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: RwLock::new(SparseSet::with_capacity(capacity)),
        }
    }
}

impl<T: Component> ErasedColumn for Column<T> {
    fn remove_entity(&mut self, entity_id: u32) -> bool {
        self.set.get_mut().remove(entity_id).is_some()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registered component types and their columns.
pub(crate) struct ComponentTypes {
    ids: HashMap<TypeId, ComponentTypeId>,
    columns: Vec<Box<dyn ErasedColumn>>,
}

impl ComponentTypes {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            columns: Vec::new(),
        }
    }

    /// Registers `T`, returning its existing id if already registered.
    pub fn register<T: Component>(&mut self, capacity: usize) -> EcsResult<ComponentTypeId> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        if self.columns.len() >= MAX_COMPONENT_TYPES {
            return Err(EcsError::TooManyComponentTypes {
                limit: MAX_COMPONENT_TYPES,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentTypeId(self.columns.len() as u8);
        self.ids.insert(TypeId::of::<T>(), id);
        self.columns.push(Box::new(Column::<T>::with_capacity(capacity)));
        tracing::debug!(component = type_name::<T>(), id = id.index(), "component type registered");
        Ok(id)
    }

    pub fn id_of<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.ids
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    pub fn column<T: Component>(&self) -> EcsResult<&Column<T>> {
        let id = self.id_of::<T>()?;
        self.columns[id.index()]
            .as_any()
            .downcast_ref::<Column<T>>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    pub fn column_mut<T: Component>(&mut self) -> EcsResult<(ComponentTypeId, &mut SparseSet<T>)> {
        let id = self.id_of::<T>()?;
        let column = self.columns[id.index()]
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))?;
        Ok((id, column.set.get_mut()))
    }

    /// Removes every component flagged in `mask` for the entity.
    pub fn remove_all(&mut self, entity_id: u32, mask: u64) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            if mask & (1 << index) != 0 {
                column.remove_entity(entity_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.type_name())
    }
}
