//! # Entity Identity
//!
//! Entities carry two identities:
//! - [`EntityHandle`]: an internal slot index plus a version counter
//! - [`Guid`]: a storage-independent 128-bit identity used by pools, spawn
//!   profiles and cross-system references
//!
//! Handles are cheap to validate but their slots are reused. GUIDs are never
//! reissued, so anything that outlives a frame should hold a GUID.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::game_object::{GameObjectPoolId, SpawnProfileId};

/// Generation-checked identifier for an entity slot.
///
/// The ID is split into two parts:
/// - Lower 32 bits: entity id, the index into the sparse arrays
/// - Upper 32 bits: version id, incremented every time the slot is freed
///
/// A handle is valid iff the slot at `entity_id` is occupied and its stored
/// version equals `version_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Creates a new handle from entity id and version id.
    #[inline]
    #[must_use]
    pub const fn new(entity_id: u32, version_id: u32) -> Self {
        Self(((version_id as u64) << 32) | (entity_id as u64))
    }

    /// Returns the slot index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn entity_id(self) -> u32 {
        self.0 as u32
    }

    /// Returns the version portion of the handle.
    #[inline]
    #[must_use]
    pub const fn version_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid handle.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this handle is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("#null")
        } else {
            write!(f, "#{}v{}", self.entity_id(), self.version_id())
        }
    }
}

/// Globally unique, storage-independent entity identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Guid(u128);

impl Guid {
    /// The nil GUID. Never issued by a [`GuidGenerator`].
    pub const NIL: Self = Self(0);

    /// Wraps a raw 128-bit value.
    #[inline]
    #[must_use]
    pub const fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    /// Returns the raw 128-bit value.
    #[inline]
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Checks if this is the nil GUID.
    #[inline]
    #[must_use]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (raw >> 96) as u32,
            (raw >> 80) as u16,
            (raw >> 64) as u16,
            (raw >> 48) as u16,
            raw & 0xffff_ffff_ffff
        )
    }
}

/// Deterministic GUID source.
///
/// Seeded so that a run can be replayed; two generators with the same seed
/// issue the same sequence.
pub struct GuidGenerator {
    rng: ChaCha8Rng,
}

impl GuidGenerator {
    /// Creates a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Issues the next GUID. Never returns [`Guid::NIL`].
    pub fn next_guid(&mut self) -> Guid {
        loop {
            let raw: u128 = self.rng.gen();
            if raw != 0 {
                return Guid(raw);
            }
        }
    }
}

impl fmt::Debug for GuidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidGenerator").finish_non_exhaustive()
    }
}

/// The identity pair yielded by views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Slot handle, valid until the entity is destroyed.
    pub handle: EntityHandle,
    /// Stable identity.
    pub guid: Guid,
}

/// Per-slot bookkeeping kept by the registry.
///
/// Tracks which components are attached via a bitmask, plus the game-object
/// level flags (active, pool membership, originating spawn profile).
#[derive(Clone, Copy, Debug)]
pub(crate) struct EntityRecord {
    /// Current handle of the slot (version of the live or last occupant).
    pub handle: EntityHandle,
    /// Stable identity of the occupant.
    pub guid: Guid,
    /// Bitmask of attached components (up to 64 component types).
    pub component_mask: u64,
    /// Bitmask of attached components that are individually disabled.
    pub disabled_mask: u64,
    /// Whether this slot is currently occupied.
    pub alive: bool,
    /// Whether the entity participates in systems.
    pub active: bool,
    /// Pool that owns this entity, if pooled.
    pub pool: Option<GameObjectPoolId>,
    /// Profile that last spawned this entity.
    pub spawn_profile: Option<SpawnProfileId>,
}

impl EntityRecord {
    /// Creates a live record.
    #[inline]
    #[must_use]
    pub const fn new(handle: EntityHandle, guid: Guid) -> Self {
        Self {
            handle,
            guid,
            component_mask: 0,
            disabled_mask: 0,
            alive: true,
            active: true,
            pool: None,
            spawn_profile: None,
        }
    }

    /// Checks if this record has a specific component.
    #[inline]
    #[must_use]
    pub const fn has_component(&self, bit: u8) -> bool {
        (self.component_mask & (1 << bit)) != 0
    }

    /// Adds a component flag.
    #[inline]
    pub fn add_component(&mut self, bit: u8) {
        self.component_mask |= 1 << bit;
    }

    /// Removes a component flag (and its disabled flag).
    #[inline]
    pub fn remove_component(&mut self, bit: u8) {
        self.component_mask &= !(1 << bit);
        self.disabled_mask &= !(1 << bit);
    }

    /// Identity pair for views.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> Entity {
        Entity {
            handle: self.handle,
            guid: self.guid,
        }
    }
}
