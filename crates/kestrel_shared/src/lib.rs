//! # Kestrel Shared
//!
//! Value types used by every layer of the engine.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - GPU APIs
//! - Windowing or input crates
//! - The ECS itself
//!
//! The engine core treats these types as opaque values.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod math;

pub use math::{Aabb, Transform, Vec3};
