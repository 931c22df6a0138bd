//! # Kestrel Game Loop
//!
//! One call to [`GameWorld::update`] is one frame:
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. BEGIN FRAME                                                      │
//! │    ├─ Delayed events of frame N-1 become readable                   │
//! │    └─ Frame events and render queue are cleared                     │
//! │                                                                     │
//! │ 2. UPDATE PHASE (systems in registration order)                     │
//! │    ├─ Read components, mutate component values                      │
//! │    ├─ Push frame events and render commands                         │
//! │    └─ Append spawn / despawn / state commands                       │
//! │                                                                     │
//! │ 3. FLUSH PHASE                                                      │
//! │    └─ despawns -> spawns -> spawn plans -> game state               │
//! │                                                                     │
//! │ 4. PUBLISH                                                          │
//! │    └─ Frame events and new delayed events go out on the event bus   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Systems only get a shared registry during the update phase, so no
//! entity can appear or vanish while another system iterates.

use std::fmt;
use std::time::{Duration, Instant};

use kestrel_core::{
    Aabb, Component, ComponentTypeId, EcsResult, EntityRegistry, GameObjectMut, GameObjectPoolId,
    GameObjectPoolManager, Query, Transform, Velocity, View,
};
use tracing::{debug, info, warn};

use crate::collision::{AabbColliderComponent, CollisionComponent, GridCollisionDetectionSystem};
use crate::commands::{
    CommandBuffer, FlushContext, FlushReport, GameStateCommandHandler, SpawnCommandHandler,
    SpawnHandlerId, WorldCommandDispatcher,
};
use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, EngineResult};
use crate::events::{DelayedEventQueue, EventBus, EventReceiver, EventSender, FrameEvents, GameEvent};
use crate::input::InputSnapshot;
use crate::render::{RenderQueue, Renderable};
use crate::spawn::{SpawnManager, SpawnProfile};
use crate::state::{GameState, GameStateManager};
use crate::systems::{
    AabbSyncSystem, LevelBoundsSystem, Lifetime, LifetimeSystem, MovementSystem, RenderSubmitSystem,
};

/// A unit of per-frame logic.
///
/// Systems run one after another in registration order. They may mutate
/// component values through views but never add or remove entities or
/// components; structural changes go through [`UpdateContext::commands`].
pub trait System {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Runs one frame of this system.
    ///
    /// # Errors
    ///
    /// Any failure aborts the frame before the flush phase.
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()>;

    /// Whether the system is skipped while the game is paused.
    fn pausable(&self) -> bool {
        true
    }
}

/// Everything a system sees during one update.
pub struct UpdateContext<'a> {
    /// Entity storage, read-only at the structural level.
    pub registry: &'a EntityRegistry,
    /// Deferred structural changes.
    pub commands: &'a mut CommandBuffer,
    /// Events of this frame.
    pub events: &'a mut FrameEvents,
    /// Events written during the previous frame.
    pub delayed_events: &'a [GameEvent],
    /// Draws of this frame.
    pub render_queue: &'a mut RenderQueue,
    /// Input sampled by the host.
    pub input: &'a InputSnapshot,
    /// Clamped frame delta in seconds.
    pub delta_time: f32,
    /// Frame number, starting at zero.
    pub frame: u64,
    /// Level extents.
    pub level_bounds: Aabb,
    /// Game state at the start of the frame.
    pub game_state: GameState,
}

impl<'a> UpdateContext<'a> {
    /// Shorthand for [`EntityRegistry::find`].
    ///
    /// # Errors
    ///
    /// Unregistered component or conflicting column borrow.
    pub fn find<Q: Query>(&self) -> EcsResult<View<'a, Q>> {
        self.registry.find::<Q>()
    }
}

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Update phase time in microseconds.
    pub update_us: u64,
    /// Flush phase time in microseconds.
    pub flush_us: u64,
    /// Events published this frame.
    pub events_published: u32,
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of update phase times.
    pub update_us_sum: u64,
    /// Sum of flush phase times.
    pub flush_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
    budget_us: u64,
}

impl FrameStatsAccumulator {
    /// Creates an accumulator measuring against `budget`.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            update_us_sum: 0,
            flush_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            budget_us: duration_us(budget),
        }
    }

    /// Records a frame. Returns `true` if it exceeded the budget.
    pub fn record(&mut self, stats: FrameStats) -> bool {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.update_us_sum += stats.update_us;
        self.flush_us_sum += stats.flush_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        let over = stats.total_us > self.budget_us;
        if over {
            self.frames_over_budget += 1;
        }
        over
    }

    /// Frame budget in microseconds.
    #[must_use]
    pub const fn budget_us(&self) -> u64 {
        self.budget_us
    }

    /// Returns average frame time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Returns average FPS.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        let avg_ms = self.avg_frame_ms();
        if avg_ms <= 0.0 {
            return 0.0;
        }
        1000.0 / avg_ms
    }

    /// Returns the share of frames over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a one-line summary.
    #[allow(clippy::cast_precision_loss)]
    pub fn log_summary(&self) {
        if self.frames_recorded == 0 {
            return;
        }
        let frames = self.frames_recorded as f64;
        info!(
            frames = self.frames_recorded,
            avg_ms = self.avg_frame_ms(),
            avg_fps = self.avg_fps(),
            min_ms = self.min_frame_us as f64 / 1000.0,
            max_ms = self.max_frame_us as f64 / 1000.0,
            avg_update_ms = self.update_us_sum as f64 / frames / 1000.0,
            avg_flush_ms = self.flush_us_sum as f64 / frames / 1000.0,
            over_budget = self.frames_over_budget,
            "frame statistics"
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new(Duration::from_micros(16_666))
    }
}

fn duration_us(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// The engine root: registry, pools, spawning, commands, events and the
/// ordered system list.
pub struct GameWorld {
    registry: EntityRegistry,
    pools: GameObjectPoolManager,
    spawner: SpawnManager,
    dispatcher: WorldCommandDispatcher,
    default_spawn_handler: SpawnHandlerId,
    state: GameStateManager,
    commands: CommandBuffer,
    frame_events: FrameEvents,
    delayed_events: DelayedEventQueue,
    render_queue: RenderQueue,
    systems: Vec<Box<dyn System>>,
    bus: EventBus,
    publisher: EventSender,
    config: EngineConfig,
    frame: u64,
    stats: FrameStatsAccumulator,
}

impl GameWorld {
    /// Creates a world and registers the built-in components.
    ///
    /// No system is installed; see [`GameWorld::with_default_systems`].
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let mut registry =
            EntityRegistry::with_capacity(config.world.entity_capacity, config.world.guid_seed);
        registry.register_component::<Transform>()?;
        registry.register_component::<Velocity>()?;
        registry.register_component::<CollisionComponent>()?;
        registry.register_component::<AabbColliderComponent>()?;
        registry.register_component::<Lifetime>()?;
        registry.register_component::<Renderable>()?;

        let mut dispatcher = WorldCommandDispatcher::new();
        let default_spawn_handler = dispatcher.add_spawn_handler(SpawnCommandHandler::new());
        dispatcher.set_state_handler(GameStateCommandHandler::new());

        let bus = EventBus::new(config.events.bus_capacity);
        let publisher = bus.sender();
        let stats = FrameStatsAccumulator::new(config.frame.target_frame_time());

        info!(
            capacity = config.world.entity_capacity,
            components = registry.component_type_count(),
            "game world created"
        );

        Ok(Self {
            registry,
            pools: GameObjectPoolManager::new(),
            spawner: SpawnManager::new(),
            dispatcher,
            default_spawn_handler,
            state: GameStateManager::new(),
            commands: CommandBuffer::new(),
            frame_events: FrameEvents::new(),
            delayed_events: DelayedEventQueue::new(),
            render_queue: RenderQueue::new(),
            systems: Vec::new(),
            bus,
            publisher,
            config,
            frame: 0,
            stats,
        })
    }

    /// Installs the built-in systems:
    /// movement, lifetime, collider sync, collision, level bounds, render
    /// submission.
    ///
    /// # Errors
    ///
    /// Collision grid cannot be built from the configuration.
    pub fn with_default_systems(mut self) -> EngineResult<Self> {
        let level_bounds = self.level_bounds();
        let collision = GridCollisionDetectionSystem::from_config(level_bounds, &self.config.collision)?;

        self.add_system(MovementSystem);
        self.add_system(LifetimeSystem);
        self.add_system(AabbSyncSystem);
        self.add_system(collision);
        self.add_system(LevelBoundsSystem::new(0.0));
        self.add_system(RenderSubmitSystem);
        Ok(self)
    }

    /// Appends a system to the update order.
    pub fn add_system(&mut self, system: impl System + 'static) {
        debug!(system = system.name(), "system added");
        self.systems.push(Box::new(system));
    }

    /// Names of installed systems in update order.
    pub fn system_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.iter().map(|system| system.name())
    }

    /// Registers a game-specific component type.
    ///
    /// # Errors
    ///
    /// Too many component types.
    pub fn register_component<T: Component>(&mut self) -> EngineResult<ComponentTypeId> {
        Ok(self.registry.register_component::<T>()?)
    }

    /// Creates and warms a pool.
    ///
    /// # Errors
    ///
    /// Duplicate id, zero size, or a failing prototype.
    pub fn create_pool<F>(&mut self, id: GameObjectPoolId, size: usize, prototype: F) -> EngineResult<()>
    where
        F: FnMut(&mut GameObjectMut<'_>) -> EcsResult<()>,
    {
        self.pools.create_pool(&mut self.registry, id, size, prototype)?;
        Ok(())
    }

    /// Creates a pool sized by its `[[pools]]` configuration entry.
    ///
    /// # Errors
    ///
    /// No entry for `id`, or any [`GameWorld::create_pool`] failure.
    pub fn create_configured_pool<F>(&mut self, id: GameObjectPoolId, prototype: F) -> EngineResult<()>
    where
        F: FnMut(&mut GameObjectMut<'_>) -> EcsResult<()>,
    {
        let size = self
            .config
            .pools
            .iter()
            .find(|pool| pool.pool_id() == id)
            .map(|pool| pool.size)
            .ok_or_else(|| ConfigError::Invalid {
                field: "pools",
                reason: format!("no entry for {id}"),
            })?;
        self.create_pool(id, size, prototype)
    }

    /// Registers a spawn profile and routes its commands to the default
    /// spawn handler.
    ///
    /// # Errors
    ///
    /// Duplicate profile id.
    pub fn add_spawn_profile(&mut self, profile: SpawnProfile) -> EngineResult<()> {
        let id = profile.id();
        self.spawner.register_profile(profile)?;
        self.dispatcher.route_profile(id, self.default_spawn_handler);
        Ok(())
    }

    /// Commands pending for the next flush.
    pub fn commands_mut(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    /// Runs the flush phase outside [`GameWorld::update`], for setup code
    /// that issues commands before the first frame.
    ///
    /// # Errors
    ///
    /// A spawn failure other than pool exhaustion.
    pub fn flush_commands(&mut self) -> EngineResult<FlushReport> {
        let level_bounds = self.config.world.level_bounds();
        let mut ctx = FlushContext {
            registry: &mut self.registry,
            pools: &mut self.pools,
            spawner: &self.spawner,
            state: &mut self.state,
            frame_events: &mut self.frame_events,
            delayed_events: &mut self.delayed_events,
            level_bounds,
        };
        self.dispatcher.flush(&mut self.commands, &mut ctx)
    }

    /// Runs one frame.
    ///
    /// `delta_time` is clamped to `[0, frame.max_delta]`.
    ///
    /// # Errors
    ///
    /// A failing system, wrapped with its name, or a spawn failure during
    /// the flush. Either way the frame's remaining commands are dropped and
    /// the frame counter does not advance. After a flush failure the events
    /// of commands already applied are still published.
    pub fn update(&mut self, delta_time: f32, input: &InputSnapshot) -> EngineResult<FlushReport> {
        let frame_start = Instant::now();
        let delta_time = if delta_time.is_finite() {
            delta_time.clamp(0.0, self.config.frame.max_delta)
        } else {
            0.0
        };

        self.delayed_events.advance();
        self.frame_events.clear();
        self.render_queue.clear();

        if let Err(error) = self.run_systems(delta_time, input) {
            let dropped = self.commands.clear();
            warn!(frame = self.frame, %error, dropped, "update phase aborted");
            return Err(error);
        }
        let update_us = duration_us(frame_start.elapsed());

        let flush_start = Instant::now();
        let flushed = self.flush_commands();
        let flush_us = duration_us(flush_start.elapsed());

        let events_published = self.publish_events();
        let report = flushed?;

        let stats = FrameStats {
            frame: self.frame,
            total_us: duration_us(frame_start.elapsed()),
            update_us,
            flush_us,
            events_published,
        };
        let over_budget = self.stats.record(stats);
        if over_budget && self.config.frame.timing_logs {
            warn!(
                frame = self.frame,
                total_us = stats.total_us,
                budget_us = self.stats.budget_us(),
                "frame exceeded budget"
            );
        }

        self.frame += 1;
        Ok(report)
    }

    fn run_systems(&mut self, delta_time: f32, input: &InputSnapshot) -> EngineResult<()> {
        let game_state = self.state.current();
        let mut ctx = UpdateContext {
            registry: &self.registry,
            commands: &mut self.commands,
            events: &mut self.frame_events,
            delayed_events: self.delayed_events.readable(),
            render_queue: &mut self.render_queue,
            input,
            delta_time,
            frame: self.frame,
            level_bounds: self.config.world.level_bounds(),
            game_state,
        };
        for system in &mut self.systems {
            if game_state == GameState::Paused && system.pausable() {
                continue;
            }
            system.update(&mut ctx).map_err(|source| EngineError::System {
                system: system.name(),
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    /// Sends this frame's events and the newly delayed ones to the bus.
    fn publish_events(&self) -> u32 {
        let mut published = 0u32;
        for event in self.frame_events.iter().chain(self.delayed_events.pending()) {
            if self.publisher.send(event.clone()) {
                published += 1;
            }
        }
        published
    }

    /// New receiver on the outbound event bus.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.bus.receiver()
    }

    /// Entity storage.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Entity storage, for setup outside the frame.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Pools.
    #[must_use]
    pub fn pools(&self) -> &GameObjectPoolManager {
        &self.pools
    }

    /// Spawn profiles.
    #[must_use]
    pub fn spawner(&self) -> &SpawnManager {
        &self.spawner
    }

    /// Current game state.
    #[must_use]
    pub fn game_state(&self) -> GameState {
        self.state.current()
    }

    /// Events raised during the last frame.
    #[must_use]
    pub fn frame_events(&self) -> &FrameEvents {
        &self.frame_events
    }

    /// Events queued for the next frame.
    #[must_use]
    pub fn delayed_events(&self) -> &DelayedEventQueue {
        &self.delayed_events
    }

    /// Draws of the last frame.
    #[must_use]
    pub fn render_queue(&self) -> &RenderQueue {
        &self.render_queue
    }

    /// Draws of the last frame, for the host to drain.
    pub fn render_queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.render_queue
    }

    /// Frames completed.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Accumulated frame statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// Level extents.
    #[must_use]
    pub fn level_bounds(&self) -> Aabb {
        self.config.world.level_bounds()
    }

    /// Configuration the world was built from.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl fmt::Debug for GameWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameWorld")
            .field("frame", &self.frame)
            .field("state", &self.state.current())
            .field("alive", &self.registry.alive_count())
            .field("systems", &self.systems.len())
            .field("pending_commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSystem {
        runs: u32,
        pausable: bool,
    }

    impl System for CountingSystem {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
            self.runs += 1;
            assert!(ctx.delta_time <= 0.1);
            Ok(())
        }

        fn pausable(&self) -> bool {
            self.pausable
        }
    }

    struct Unregistered;

    impl Component for Unregistered {}

    struct FailingSystem;

    impl System for FailingSystem {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
            ctx.find::<(&Unregistered,)>()?;
            Ok(())
        }
    }

    #[test]
    fn test_frame_counter_and_clamp() {
        let mut world = GameWorld::new(EngineConfig::default()).unwrap();
        world.add_system(CountingSystem { runs: 0, pausable: true });

        world.update(5.0, &InputSnapshot::EMPTY).unwrap();
        world.update(f32::NAN, &InputSnapshot::EMPTY).unwrap();
        assert_eq!(world.frame(), 2);
        assert_eq!(world.stats().frames_recorded, 2);
    }

    #[test]
    fn test_failing_system_is_named() {
        let mut world = GameWorld::new(EngineConfig::default()).unwrap();
        world.add_system(FailingSystem);

        let error = world.update(0.016, &InputSnapshot::EMPTY).unwrap_err();
        assert!(matches!(error, EngineError::System { system: "failing", .. }));
        assert_eq!(world.frame(), 0);
    }

    #[test]
    fn test_default_systems_order() {
        let world = GameWorld::new(EngineConfig::default())
            .unwrap()
            .with_default_systems()
            .unwrap();
        let names: Vec<_> = world.system_names().collect();
        assert_eq!(
            names,
            vec![
                "movement",
                "lifetime",
                "aabb_sync",
                "grid_collision_detection",
                "level_bounds",
                "render_submit"
            ]
        );
    }

    #[test]
    fn test_stats_accumulator() {
        let mut stats = FrameStatsAccumulator::new(Duration::from_millis(10));
        assert!(!stats.record(FrameStats {
            total_us: 5_000,
            ..FrameStats::default()
        }));
        assert!(stats.record(FrameStats {
            total_us: 15_000,
            ..FrameStats::default()
        }));
        assert_eq!(stats.frames_over_budget, 1);
        assert_eq!(stats.min_frame_us, 5_000);
        assert_eq!(stats.max_frame_us, 15_000);
        assert!((stats.avg_frame_ms() - 10.0).abs() < 1e-9);
        assert!((stats.over_budget_ratio() - 0.5).abs() < 1e-9);
    }
}
