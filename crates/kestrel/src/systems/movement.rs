//! Integration of velocities and collider bounds.

use kestrel_core::{Transform, Velocity, ViewFilter};

use crate::collision::AabbColliderComponent;
use crate::error::EngineResult;
use crate::game_loop::{System, UpdateContext};

/// Moves active entities by `velocity * dt`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        let dt = ctx.delta_time;
        ctx.find::<(&mut Transform, &Velocity)>()?
            .with_filter(ViewFilter::ACTIVE | ViewFilter::ENABLED)
            .each(|_, (transform, velocity)| {
                transform.position += velocity.0 * dt;
            });
        Ok(())
    }
}

/// Recomputes collider world bounds from transforms.
#[derive(Clone, Copy, Debug, Default)]
pub struct AabbSyncSystem;

impl System for AabbSyncSystem {
    fn name(&self) -> &'static str {
        "aabb_sync"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        ctx.find::<(&mut AabbColliderComponent, &Transform)>()?
            .with_filter(ViewFilter::ACTIVE)
            .each(|_, (collider, transform)| collider.sync(transform));
        Ok(())
    }
}
