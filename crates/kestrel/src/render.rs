//! # Render Boundary
//!
//! The engine never talks to a graphics API. Systems describe what to draw
//! as [`RenderCommand`]s; the host drains the [`RenderQueue`] once per frame
//! and translates the opaque mesh/material ids into device calls.

use kestrel_core::{Component, Guid, Transform, Vec3};

/// Opaque mesh reference owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Opaque material reference owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Marks an entity as drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Renderable {
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Material to draw it with.
    pub material: MaterialId,
}

impl Component for Renderable {}

/// Uniform value attached to a draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    /// Scalar.
    Float(f32),
    /// Three-component vector.
    Vec3(Vec3),
}

/// One draw descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderCommand {
    /// Entity being drawn.
    pub entity: Guid,
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Material to draw it with.
    pub material: MaterialId,
    /// World transform.
    pub transform: Transform,
    /// Named uniforms.
    pub uniforms: Vec<(&'static str, UniformValue)>,
}

/// Draws collected during one frame.
#[derive(Clone, Debug, Default)]
pub struct RenderQueue {
    commands: Vec<RenderCommand>,
}

impl RenderQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a draw.
    pub fn submit(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    /// Draws in submission order.
    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Number of queued draws.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Hands every draw to the caller, leaving the queue empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, RenderCommand> {
        self.commands.drain(..)
    }

    /// Drops every draw, keeping capacity.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
