//! Spawn profiles and per-request spawn data.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kestrel_core::{EntityHandle, GameObjectPoolId, SpawnProfileId, Vec3};

use super::initializer::SpawnInitializer;
use super::placer::SpawnPlacer;
use crate::error::{SpawnError, SpawnResult};

/// Identifier of a scheduling rule that issues spawn plans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnRuleId(pub u32);

impl fmt::Display for SpawnRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// A live entity that triggered a spawn, such as a ship firing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterContext {
    /// Emitter position at the time of the request.
    pub position: Vec3,
    /// Emitter velocity at the time of the request.
    pub velocity: Vec3,
    /// The emitting entity.
    pub source: EntityHandle,
}

/// Data carried by a single spawn request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpawnContext {
    /// Set when another entity emitted the spawn.
    pub emitter: Option<EmitterContext>,
}

impl SpawnContext {
    /// Context inheriting from an emitting entity.
    #[must_use]
    pub const fn from_emitter(position: Vec3, velocity: Vec3, source: EntityHandle) -> Self {
        Self {
            emitter: Some(EmitterContext {
                position,
                velocity,
                source,
            }),
        }
    }
}

/// Position of one spawn inside a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPlanCursor {
    /// Entities spawned by the batch.
    pub total: usize,
    /// Zero-based index of this spawn.
    pub index: usize,
}

impl SpawnPlanCursor {
    /// Cursor of a standalone spawn.
    pub const SINGLE: Self = Self { total: 1, index: 0 };

    /// Center of this spawn's slice of `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let fraction = (self.index as f32 + 0.5) / self.total.max(1) as f32;
        fraction
    }
}

/// Which pool to draw from and how to place and initialize what comes out.
///
/// Immutable once registered and shared by every command that names it.
#[derive(Clone)]
pub struct SpawnProfile {
    id: SpawnProfileId,
    pool: GameObjectPoolId,
    placer: Arc<dyn SpawnPlacer>,
    initializer: Arc<dyn SpawnInitializer>,
}

impl SpawnProfile {
    /// Creates a profile.
    pub fn new(
        id: SpawnProfileId,
        pool: GameObjectPoolId,
        placer: impl SpawnPlacer + 'static,
        initializer: impl SpawnInitializer + 'static,
    ) -> Self {
        Self {
            id,
            pool,
            placer: Arc::new(placer),
            initializer: Arc::new(initializer),
        }
    }

    /// Profile id.
    #[must_use]
    pub const fn id(&self) -> SpawnProfileId {
        self.id
    }

    /// Pool this profile draws from.
    #[must_use]
    pub const fn pool(&self) -> GameObjectPoolId {
        self.pool
    }

    /// Placement strategy.
    #[must_use]
    pub fn placer(&self) -> &dyn SpawnPlacer {
        self.placer.as_ref()
    }

    /// Initialization strategy.
    #[must_use]
    pub fn initializer(&self) -> &dyn SpawnInitializer {
        self.initializer.as_ref()
    }
}

impl fmt::Debug for SpawnProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnProfile")
            .field("id", &self.id)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Registered profiles by id.
#[derive(Debug, Default)]
pub struct SpawnProfileRegistry {
    profiles: HashMap<SpawnProfileId, Arc<SpawnProfile>>,
}

impl SpawnProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile.
    ///
    /// # Errors
    ///
    /// [`SpawnError::DuplicateProfile`] if the id is taken.
    pub fn register(&mut self, profile: SpawnProfile) -> SpawnResult<()> {
        let id = profile.id();
        if self.profiles.contains_key(&id) {
            return Err(SpawnError::DuplicateProfile(id));
        }
        self.profiles.insert(id, Arc::new(profile));
        Ok(())
    }

    /// Looks a profile up.
    ///
    /// # Errors
    ///
    /// [`SpawnError::UnknownProfile`] if nothing is registered under `id`.
    pub fn get(&self, id: SpawnProfileId) -> SpawnResult<&Arc<SpawnProfile>> {
        self.profiles.get(&id).ok_or(SpawnError::UnknownProfile(id))
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: SpawnProfileId) -> bool {
        self.profiles.contains_key(&id)
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no profile is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
