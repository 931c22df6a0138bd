//! Collection of draws for the host renderer.

use kestrel_core::{Transform, ViewFilter};

use crate::error::EngineResult;
use crate::game_loop::{System, UpdateContext};
use crate::render::{RenderCommand, Renderable};

/// Submits one [`RenderCommand`] per active renderable entity.
///
/// Keeps running while paused so the last frame stays on screen.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderSubmitSystem;

impl System for RenderSubmitSystem {
    fn name(&self) -> &'static str {
        "render_submit"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        let registry = ctx.registry;
        let queue = &mut *ctx.render_queue;
        registry
            .find::<(&Renderable, &Transform)>()?
            .with_filter(ViewFilter::ACTIVE | ViewFilter::ENABLED)
            .each(|entity, (renderable, transform)| {
                queue.submit(RenderCommand {
                    entity: entity.guid,
                    mesh: renderable.mesh,
                    material: renderable.material,
                    transform: *transform,
                    uniforms: Vec::new(),
                });
            });
        Ok(())
    }

    fn pausable(&self) -> bool {
        false
    }
}
