//! # Grid Collision Detection
//!
//! Runs in three phases every frame:
//!
//! 1. **prepare** - clear the grid, the candidate list and the solved pairs
//! 2. **broadphase** - every active entity with an enabled
//!    [`CollisionComponent`] and an initialized [`AabbColliderComponent`]
//!    is inserted into each cell its world bounds touch
//! 3. **narrowphase** - within each cell holding a collision reporter, every
//!    unordered pair is tested once across the whole grid
//!
//! A pair sharing several cells is recorded as solved the first time it is
//! seen, before the overlap test, so it is never tested or reported twice.

use std::collections::HashSet;

use kestrel_core::{Aabb, EcsResult, Entity, EntityRegistry, Guid, ViewFilter};
use tracing::trace;

use super::components::{AabbColliderComponent, CollisionComponent};
use super::grid::CollisionGrid;
use crate::config::CollisionConfig;
use crate::error::{EngineResult, GridError};
use crate::events::{CollisionEvent, FrameEvents, GameEvent};
use crate::game_loop::{System, UpdateContext};

/// One broadphase entry.
#[derive(Clone, Copy, Debug)]
struct CollisionCandidate {
    entity: Entity,
    bounds: Aabb,
    collision: CollisionComponent,
}

/// Uniform-grid broadphase plus AABB narrowphase.
#[derive(Debug)]
pub struct GridCollisionDetectionSystem {
    grid: CollisionGrid,
    candidates: Vec<CollisionCandidate>,
    /// Canonical `(low, high)` GUID pairs tested this frame.
    solved_pairs: HashSet<(Guid, Guid)>,
}

impl GridCollisionDetectionSystem {
    /// Creates a system over an existing grid.
    #[must_use]
    pub fn new(grid: CollisionGrid) -> Self {
        Self {
            grid,
            candidates: Vec::new(),
            solved_pairs: HashSet::new(),
        }
    }

    /// Builds the grid over `level_bounds` from the collision config.
    ///
    /// # Errors
    ///
    /// Invalid cell size or empty level bounds.
    pub fn from_config(level_bounds: Aabb, config: &CollisionConfig) -> Result<Self, GridError> {
        let grid = match config.cell_size {
            Some(cell_size) => CollisionGrid::new(level_bounds, cell_size)?,
            None => CollisionGrid::from_expected_population(level_bounds, config.expected_population)?,
        };
        Ok(Self::new(grid))
    }

    /// The spatial grid.
    #[must_use]
    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    /// Runs all three phases, pushing collision events into `events`.
    ///
    /// Returns the number of events raised.
    ///
    /// # Errors
    ///
    /// Collision components not registered, or a column already borrowed
    /// for writing.
    pub fn detect(&mut self, registry: &EntityRegistry, events: &mut FrameEvents) -> EcsResult<usize> {
        self.prepare();
        self.broadphase(registry)?;
        Ok(self.narrowphase(events))
    }

    /// Resets per-frame state.
    pub fn prepare(&mut self) {
        self.grid.clear();
        self.candidates.clear();
        self.solved_pairs.clear();
    }

    /// Inserts every eligible entity into the grid.
    ///
    /// # Errors
    ///
    /// Collision components not registered, or a column already borrowed
    /// for writing.
    pub fn broadphase(&mut self, registry: &EntityRegistry) -> EcsResult<()> {
        let grid = &mut self.grid;
        let candidates = &mut self.candidates;

        registry
            .find::<(&CollisionComponent, &AabbColliderComponent)>()?
            .with_filter(ViewFilter::ACTIVE | ViewFilter::ENABLED)
            .each(|entity, (collision, collider)| {
                if !collision.is_enabled() {
                    return;
                }
                let Some(bounds) = collider.world_bounds() else {
                    return;
                };
                let Ok(index) = u32::try_from(candidates.len()) else {
                    return;
                };
                let range = grid.world_bounds_to_grid_bounds(&bounds);
                grid.insert(range, index);
                candidates.push(CollisionCandidate {
                    entity,
                    bounds,
                    collision: *collision,
                });
            });

        trace!(candidates = self.candidates.len(), "collision broadphase done");
        Ok(())
    }

    /// Tests candidate pairs cell by cell. Returns the number of events.
    pub fn narrowphase(&mut self, events: &mut FrameEvents) -> usize {
        let mut raised = 0;

        for cell in self.grid.occupied_cells() {
            if cell.len() < 2 {
                continue;
            }
            let has_reporter = cell
                .iter()
                .any(|&i| self.candidates[i as usize].collision.is_collision_reporter);
            if !has_reporter {
                continue;
            }

            for (n, &i) in cell.iter().enumerate() {
                for &j in &cell[n + 1..] {
                    let a = &self.candidates[i as usize];
                    let b = &self.candidates[j as usize];
                    if a.entity.guid == b.entity.guid {
                        continue;
                    }
                    if !self.solved_pairs.insert(canonical_pair(a.entity.guid, b.entity.guid)) {
                        continue;
                    }
                    if let Some(event) = solve_pair(a, b) {
                        events.push(event);
                        raised += 1;
                    }
                }
            }
        }

        raised
    }
}

impl System for GridCollisionDetectionSystem {
    fn name(&self) -> &'static str {
        "grid_collision_detection"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        self.detect(ctx.registry, ctx.events)?;
        Ok(())
    }
}

fn canonical_pair(a: Guid, b: Guid) -> (Guid, Guid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Decides whether a pair collides and which side reports it.
///
/// Solid wins over trigger when both apply. With two reporters, a trigger
/// is reported by the side whose trigger mask matched; otherwise the lower
/// GUID reports.
fn solve_pair(a: &CollisionCandidate, b: &CollisionCandidate) -> Option<GameEvent> {
    let a_reports = a.collision.is_collision_reporter;
    let b_reports = b.collision.is_collision_reporter;
    if !a_reports && !b_reports {
        return None;
    }

    let solid = a.collision.can_solid_collide_with(&b.collision)
        && b.collision.can_solid_collide_with(&a.collision);
    let a_triggers = a.collision.can_trigger_with(&b.collision);
    let b_triggers = b.collision.can_trigger_with(&a.collision);
    if !solid && !a_triggers && !b_triggers {
        return None;
    }

    let overlap = a.bounds.intersection(&b.bounds)?;

    let a_is_source = match (a_reports, b_reports) {
        (true, false) => true,
        (false, true) => false,
        _ if !solid && a_triggers != b_triggers => a_triggers,
        _ => a.entity.guid < b.entity.guid,
    };
    let (source, target) = if a_is_source { (a, b) } else { (b, a) };

    let event = CollisionEvent {
        source: source.entity.handle,
        source_guid: source.entity.guid,
        target: target.entity.handle,
        target_guid: target.entity.guid,
        contact_point: overlap.center(),
    };

    Some(if solid {
        GameEvent::SolidCollision(event)
    } else {
        GameEvent::TriggerCollision(event)
    })
}

#[cfg(test)]
mod tests {
    use kestrel_core::{Transform, Vec3};

    use super::*;
    use crate::collision::CollisionLayer;

    const SHIP: CollisionLayer = CollisionLayer(0);
    const ROCK: CollisionLayer = CollisionLayer(1);
    const PICKUP: CollisionLayer = CollisionLayer(2);

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new(11);
        registry.register_component::<CollisionComponent>().unwrap();
        registry.register_component::<AabbColliderComponent>().unwrap();
        registry
    }

    fn spawn(
        registry: &mut EntityRegistry,
        collision: CollisionComponent,
        min: Vec3,
        max: Vec3,
    ) -> Entity {
        let handle = registry.create();
        let size = max - min;
        let mut collider = AabbColliderComponent::new(Aabb::new(Vec3::ZERO, size));
        collider.sync(&Transform::from_position(min));
        registry.insert(handle, collision).unwrap();
        registry.insert(handle, collider).unwrap();
        registry.game_object(handle).unwrap().entity()
    }

    fn system() -> GridCollisionDetectionSystem {
        let grid = CollisionGrid::new(Aabb::new(Vec3::ZERO, Vec3::splat(20.0)), 10.0).unwrap();
        GridCollisionDetectionSystem::new(grid)
    }

    fn ship() -> CollisionComponent {
        CollisionComponent::new(SHIP).with_solid_mask(ROCK.mask()).reporting()
    }

    fn rock() -> CollisionComponent {
        CollisionComponent::new(ROCK).with_solid_mask(SHIP.mask())
    }

    fn collision_of(event: &GameEvent) -> &CollisionEvent {
        match event {
            GameEvent::SolidCollision(event) | GameEvent::TriggerCollision(event) => event,
            other => panic!("not a collision: {other:?}"),
        }
    }

    #[test]
    fn test_straddling_pair_reported_once() {
        let mut registry = registry();
        let a = spawn(&mut registry, ship(), Vec3::splat(1.0), Vec3::splat(9.0));
        let b = spawn(&mut registry, rock(), Vec3::splat(5.0), Vec3::splat(15.0));

        let mut system = system();
        let mut events = FrameEvents::new();
        assert_eq!(system.detect(&registry, &mut events).unwrap(), 1);

        let [GameEvent::SolidCollision(event)] = events.as_slice() else {
            panic!("expected one solid collision, got {:?}", events.as_slice());
        };
        assert_eq!(event.source_guid, a.guid);
        assert_eq!(event.target_guid, b.guid);
        assert_eq!(event.contact_point, Vec3::splat(7.0));
    }

    #[test]
    fn test_pair_sharing_many_cells_tested_once() {
        let mut registry = registry();
        spawn(&mut registry, ship(), Vec3::new(8.0, 8.0, 1.0), Vec3::new(12.0, 12.0, 4.0));
        spawn(&mut registry, rock(), Vec3::new(9.0, 9.0, 2.0), Vec3::new(11.0, 14.0, 3.0));

        let mut system = system();
        let mut events = FrameEvents::new();
        system.detect(&registry, &mut events).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(system.solved_pairs.len(), 1);
    }

    #[test]
    fn test_no_reporter_no_event() {
        let mut registry = registry();
        let quiet_ship = CollisionComponent::new(SHIP).with_solid_mask(ROCK.mask());
        spawn(&mut registry, quiet_ship, Vec3::splat(1.0), Vec3::splat(5.0));
        spawn(&mut registry, rock(), Vec3::splat(2.0), Vec3::splat(6.0));

        let mut events = FrameEvents::new();
        assert_eq!(system().detect(&registry, &mut events).unwrap(), 0);
    }

    #[test]
    fn test_one_sided_solid_is_ignored() {
        let mut registry = registry();
        let deaf_rock = CollisionComponent::new(ROCK);
        spawn(&mut registry, ship(), Vec3::splat(1.0), Vec3::splat(5.0));
        spawn(&mut registry, deaf_rock.with_trigger_mask(PICKUP.mask()), Vec3::splat(2.0), Vec3::splat(6.0));

        let mut events = FrameEvents::new();
        assert_eq!(system().detect(&registry, &mut events).unwrap(), 0);
    }

    #[test]
    fn test_trigger_source_is_the_granting_side() {
        let mut registry = registry();
        let pickup = CollisionComponent::new(PICKUP).with_trigger_mask(SHIP.mask()).reporting();
        let collector = CollisionComponent::new(SHIP).with_solid_mask(ROCK.mask()).reporting();
        let p = spawn(&mut registry, pickup, Vec3::splat(1.0), Vec3::splat(3.0));
        let s = spawn(&mut registry, collector, Vec3::splat(2.0), Vec3::splat(4.0));

        let mut events = FrameEvents::new();
        system().detect(&registry, &mut events).unwrap();

        let [GameEvent::TriggerCollision(event)] = events.as_slice() else {
            panic!("expected one trigger, got {:?}", events.as_slice());
        };
        assert_eq!(event.source_guid, p.guid);
        assert_eq!(event.target_guid, s.guid);
    }

    #[test]
    fn test_two_reporters_lower_guid_is_source() {
        let mut registry = registry();
        let a = spawn(&mut registry, ship().with_solid_mask(SHIP.mask()), Vec3::splat(1.0), Vec3::splat(3.0));
        let b = spawn(&mut registry, ship().with_solid_mask(SHIP.mask()), Vec3::splat(2.0), Vec3::splat(4.0));

        let mut events = FrameEvents::new();
        system().detect(&registry, &mut events).unwrap();

        assert_eq!(events.len(), 1);
        let event = collision_of(&events.as_slice()[0]);
        assert_eq!(event.source_guid, a.guid.min(b.guid));
        assert_eq!(event.target_guid, a.guid.max(b.guid));
    }

    #[test]
    fn test_inactive_and_uninitialized_are_skipped() {
        let mut registry = registry();
        let a = spawn(&mut registry, ship(), Vec3::splat(1.0), Vec3::splat(5.0));
        spawn(&mut registry, rock(), Vec3::splat(2.0), Vec3::splat(6.0));
        registry.set_active(a.handle, false);

        let unsynced = registry.create();
        registry.insert(unsynced, rock()).unwrap();
        registry.insert(unsynced, AabbColliderComponent::cube(5.0)).unwrap();

        let mut events = FrameEvents::new();
        assert_eq!(system().detect(&registry, &mut events).unwrap(), 0);
    }

    #[test]
    fn test_touching_boxes_do_not_collide() {
        let mut registry = registry();
        spawn(&mut registry, ship(), Vec3::splat(1.0), Vec3::splat(5.0));
        spawn(&mut registry, rock(), Vec3::new(5.0, 1.0, 1.0), Vec3::new(9.0, 5.0, 5.0));

        let mut events = FrameEvents::new();
        assert_eq!(system().detect(&registry, &mut events).unwrap(), 0);
    }
}
