//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [world]
//! entity_capacity = 8192
//! guid_seed = 7
//! level_min = [-50.0, -50.0, -50.0]
//! level_max = [50.0, 50.0, 50.0]
//!
//! [collision]
//! cell_size = 10.0
//!
//! [frame]
//! target_fps = 60
//! max_delta = 0.1
//!
//! [[pools]]
//! id = 1
//! size = 256
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use kestrel_core::{Aabb, GameObjectPoolId, Vec3};
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionGrid, MAX_GRID_CELLS};
use crate::error::{ConfigError, ConfigResult};

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Registry sizing and level extents.
    pub world: WorldConfig,
    /// Collision grid sizing.
    pub collision: CollisionConfig,
    /// Outbound event bus.
    pub events: EventConfig,
    /// Frame timing.
    pub frame: FrameConfig,
    /// Pools warmed at startup.
    pub pools: Vec<PoolConfig>,
}

/// `[world]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Entities reserved up front.
    pub entity_capacity: usize,
    /// Seed of the GUID generator.
    pub guid_seed: u64,
    /// Minimum corner of the level.
    pub level_min: [f32; 3],
    /// Maximum corner of the level.
    pub level_max: [f32; 3],
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 4096,
            guid_seed: 0x4b45_5354,
            level_min: [-100.0; 3],
            level_max: [100.0; 3],
        }
    }
}

impl WorldConfig {
    /// Level bounds as a box.
    #[must_use]
    pub fn level_bounds(&self) -> Aabb {
        Aabb::new(Vec3::from_array(self.level_min), Vec3::from_array(self.level_max))
    }
}

/// `[collision]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollisionConfig {
    /// Fixed cell edge length. When absent the grid is sized from
    /// `expected_population`.
    pub cell_size: Option<f32>,
    /// Expected number of live colliders.
    pub expected_population: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            cell_size: None,
            expected_population: 1024,
        }
    }
}

/// `[events]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventConfig {
    /// Maximum events in flight on the outbound bus.
    pub bus_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { bus_capacity: 2048 }
    }
}

/// `[frame]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Target frames per second.
    pub target_fps: u32,
    /// Largest delta time handed to systems, in seconds.
    pub max_delta: f32,
    /// Log frames that exceed the budget.
    pub timing_logs: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_delta: 0.1,
            timing_logs: false,
        }
    }
}

impl FrameConfig {
    /// Frame budget derived from `target_fps`.
    #[must_use]
    pub fn target_frame_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

/// One `[[pools]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Pool id.
    pub id: u32,
    /// Number of objects warmed.
    pub size: usize,
}

impl PoolConfig {
    /// Typed pool id.
    #[must_use]
    pub fn pool_id(&self) -> GameObjectPoolId {
        GameObjectPoolId(self.id)
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Malformed TOML or out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Unreadable file, malformed TOML or out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), pools = config.pools.len(), "engine config loaded");
        Ok(config)
    }

    /// Checks every value range.
    ///
    /// # Errors
    ///
    /// The first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.world.level_bounds().is_valid() {
            return Err(invalid("world.level_min", "level bounds must have volume"));
        }
        if let Some(cell_size) = self.collision.cell_size {
            CollisionGrid::cell_count_for(&self.world.level_bounds(), cell_size)
                .map_err(|error| invalid("collision.cell_size", error.to_string()))?;
        }
        if self.collision.expected_population == 0 {
            return Err(invalid("collision.expected_population", "must be non-zero"));
        }
        if self.collision.expected_population > MAX_GRID_CELLS {
            return Err(invalid(
                "collision.expected_population",
                format!("must be at most {MAX_GRID_CELLS}"),
            ));
        }
        if self.events.bus_capacity == 0 {
            return Err(invalid("events.bus_capacity", "must be non-zero"));
        }
        if self.frame.target_fps == 0 {
            return Err(invalid("frame.target_fps", "must be non-zero"));
        }
        if !(self.frame.max_delta.is_finite() && self.frame.max_delta > 0.0) {
            return Err(invalid("frame.max_delta", "must be positive"));
        }

        let mut seen = HashSet::with_capacity(self.pools.len());
        for pool in &self.pools {
            if pool.size == 0 {
                return Err(invalid("pools.size", format!("pool {} has size 0", pool.id)));
            }
            if !seen.insert(pool.id) {
                return Err(ConfigError::DuplicatePool(pool.pool_id()));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.frame.target_fps, 60);
        assert!(config.pools.is_empty());
    }

    #[test]
    fn test_full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            [world]
            entity_capacity = 512
            guid_seed = 9
            level_min = [0.0, 0.0, 0.0]
            level_max = [20.0, 20.0, 20.0]

            [collision]
            cell_size = 10.0

            [frame]
            target_fps = 30
            timing_logs = true

            [[pools]]
            id = 1
            size = 64

            [[pools]]
            id = 2
            size = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.world.entity_capacity, 512);
        assert_eq!(
            config.world.level_bounds(),
            Aabb::new(Vec3::ZERO, Vec3::splat(20.0))
        );
        assert_eq!(config.collision.cell_size, Some(10.0));
        assert_eq!(config.collision.expected_population, 1024);
        assert_eq!(config.frame.max_delta, 0.1);
        assert_eq!(config.pools.len(), 2);
        assert_eq!(config.pools[1].pool_id(), GameObjectPoolId(2));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("[collision]\ncell_size = 0.0"),
            Err(ConfigError::Invalid { field: "collision.cell_size", .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[collision]\ncell_size = 0.000001"),
            Err(ConfigError::Invalid { field: "collision.cell_size", .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[collision]\nexpected_population = 100000000"),
            Err(ConfigError::Invalid { field: "collision.expected_population", .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[[pools]]\nid = 1\nsize = 0"),
            Err(ConfigError::Invalid { field: "pools.size", .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[[pools]]\nid = 1\nsize = 2\n[[pools]]\nid = 1\nsize = 3"),
            Err(ConfigError::DuplicatePool(GameObjectPoolId(1)))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[world]\nlevel_min = [1.0, 1.0, 1.0]\nlevel_max = [1.0, 2.0, 2.0]"),
            Err(ConfigError::Invalid { field: "world.level_min", .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_fields_and_bad_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("[world]\nbogus = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[world"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_target_frame_time() {
        let frame = FrameConfig::default();
        assert_eq!(frame.target_frame_time().as_micros(), 16_666);
    }
}
