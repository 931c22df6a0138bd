//! # Spawn Placement
//!
//! A [`SpawnPlacer`] picks the world position of a freshly acquired object.
//! `current_bounds` is the object's collider at its current position, so
//! placers can keep the whole body inside the level.

use kestrel_core::{Aabb, Guid, Vec3};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::profile::{SpawnContext, SpawnPlanCursor};

/// Chooses where a spawned object goes.
pub trait SpawnPlacer: Send + Sync {
    /// World position for the object `guid`.
    fn position(
        &self,
        guid: Guid,
        current_bounds: &Aabb,
        level_bounds: &Aabb,
        cursor: SpawnPlanCursor,
        context: &SpawnContext,
    ) -> Vec3;
}

/// Always the same point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedPlacer {
    position: Vec3,
}

impl FixedPlacer {
    /// Places everything at `position`.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self { position }
    }
}

impl SpawnPlacer for FixedPlacer {
    fn position(&self, _: Guid, _: &Aabb, _: &Aabb, _: SpawnPlanCursor, _: &SpawnContext) -> Vec3 {
        self.position
    }
}

/// Emitter position plus an offset. Falls back to a fixed point when the
/// request carries no emitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterPlacer {
    /// Added to the emitter position.
    pub offset: Vec3,
    /// Used without an emitter.
    pub fallback: Vec3,
}

impl SpawnPlacer for EmitterPlacer {
    fn position(&self, _: Guid, _: &Aabb, _: &Aabb, _: SpawnPlanCursor, context: &SpawnContext) -> Vec3 {
        context
            .emitter
            .map_or(self.fallback, |emitter| emitter.position + self.offset)
    }
}

/// World axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Spreads a batch evenly along one axis of the level.
///
/// Spawn `i` of `n` sits at the center of the `i`-th of `n` equal slices;
/// the other two coordinates come from `anchor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisDistributionPlacer {
    /// Axis the batch is spread over.
    pub axis: Axis,
    /// Source of the remaining coordinates.
    pub anchor: Vec3,
}

impl SpawnPlacer for AxisDistributionPlacer {
    fn position(
        &self,
        _: Guid,
        _: &Aabb,
        level_bounds: &Aabb,
        cursor: SpawnPlanCursor,
        _: &SpawnContext,
    ) -> Vec3 {
        let axis = self.axis.index();
        let min = level_bounds.min.axis(axis);
        let extent = level_bounds.max.axis(axis) - min;

        let mut coords = self.anchor.to_array();
        coords[axis] = min + extent * cursor.fraction();
        Vec3::from_array(coords)
    }
}

/// Uniformly random position keeping the object's bounds inside the level.
///
/// Seeded, so a run can be replayed.
#[derive(Debug)]
pub struct RandomPlacer {
    rng: Mutex<ChaCha8Rng>,
}

impl RandomPlacer {
    /// Creates a placer with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl SpawnPlacer for RandomPlacer {
    fn position(
        &self,
        _: Guid,
        current_bounds: &Aabb,
        level_bounds: &Aabb,
        _: SpawnPlanCursor,
        _: &SpawnContext,
    ) -> Vec3 {
        let half = current_bounds.half_extents();
        let low = level_bounds.min + half;
        let high = level_bounds.max - half;

        let mut rng = self.rng.lock();
        let mut coords = [0.0; 3];
        for (axis, coord) in coords.iter_mut().enumerate() {
            let (lo, hi) = (low.axis(axis), high.axis(axis));
            // Objects wider than the level are centered on that axis.
            *coord = if lo < hi {
                rng.gen_range(lo..hi)
            } else {
                level_bounds.center().axis(axis)
            };
        }
        Vec3::from_array(coords)
    }
}
