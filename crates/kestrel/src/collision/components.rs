//! Collision components.

use kestrel_core::{Aabb, Component, Transform, Vec3};

/// Collision layer index, `0..32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionLayer(pub u8);

impl CollisionLayer {
    /// Mask with only this layer's bit set. Layers past 31 map to no bit.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u32 {
        if self.0 < 32 {
            1 << self.0
        } else {
            0
        }
    }
}

/// Layer membership and collision masks of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionComponent {
    /// The layer this entity lives on.
    pub layer: CollisionLayer,
    /// Layers this entity physically blocks.
    pub solid_mask: u32,
    /// Layers this entity reports overlaps with.
    pub trigger_mask: u32,
    /// Whether overlaps involving this entity produce events.
    pub is_collision_reporter: bool,
}

impl CollisionComponent {
    /// Non-reporting component on `layer` with empty masks.
    #[must_use]
    pub const fn new(layer: CollisionLayer) -> Self {
        Self {
            layer,
            solid_mask: 0,
            trigger_mask: 0,
            is_collision_reporter: false,
        }
    }

    /// Sets the solid mask.
    #[must_use]
    pub const fn with_solid_mask(mut self, mask: u32) -> Self {
        self.solid_mask = mask;
        self
    }

    /// Sets the trigger mask.
    #[must_use]
    pub const fn with_trigger_mask(mut self, mask: u32) -> Self {
        self.trigger_mask = mask;
        self
    }

    /// Marks the entity as a collision reporter.
    #[must_use]
    pub const fn reporting(mut self) -> Self {
        self.is_collision_reporter = true;
        self
    }

    /// False when both masks are empty. Such entities skip the broadphase.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.solid_mask | self.trigger_mask != 0
    }

    /// Whether this entity's solid mask includes `other`'s layer.
    #[inline]
    #[must_use]
    pub const fn can_solid_collide_with(&self, other: &Self) -> bool {
        self.solid_mask & other.layer.mask() != 0
    }

    /// Whether this entity's trigger mask includes `other`'s layer.
    #[inline]
    #[must_use]
    pub const fn can_trigger_with(&self, other: &Self) -> bool {
        self.trigger_mask & other.layer.mask() != 0
    }
}

impl Component for CollisionComponent {}

/// Axis-aligned collider relative to the entity's transform.
///
/// World bounds stay uninitialized until the first sync with a transform,
/// and uninitialized colliders are ignored by collision detection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AabbColliderComponent {
    /// Bounds in local space, before scale.
    pub local_bounds: Aabb,
    /// Bounds in world space as of the last sync.
    pub world_bounds: Aabb,
    /// Whether `world_bounds` has been computed.
    pub initialized: bool,
}

impl AabbColliderComponent {
    /// Collider with the given local bounds.
    #[must_use]
    pub const fn new(local_bounds: Aabb) -> Self {
        Self {
            local_bounds,
            world_bounds: local_bounds,
            initialized: false,
        }
    }

    /// Cube collider centered on the entity.
    #[must_use]
    pub fn cube(half_extent: f32) -> Self {
        Self::new(Aabb::from_center(Vec3::ZERO, Vec3::splat(half_extent)))
    }

    /// World bounds this collider would have under `transform`.
    #[must_use]
    pub fn bounds_at(&self, transform: &Transform) -> Aabb {
        let a = self.local_bounds.min.mul_elements(transform.scale);
        let b = self.local_bounds.max.mul_elements(transform.scale);
        Aabb::new(
            transform.position + a.min(b),
            transform.position + a.max(b),
        )
    }

    /// Recomputes world bounds from `transform`.
    pub fn sync(&mut self, transform: &Transform) {
        self.world_bounds = self.bounds_at(transform);
        self.initialized = true;
    }

    /// World bounds, if initialized.
    #[must_use]
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.initialized.then_some(self.world_bounds)
    }
}

impl Component for AabbColliderComponent {}
