//! Core types and utilities for the Prism renderer.
//!
//! This crate provides the foundational pieces used throughout the engine:
//! - Overflow-checked arithmetic for buffer-size and offset math
//! - The engine-wide error type
//! - Typed whole-file reads
//! - Mesh bounds math

pub mod checked;
pub mod error;
pub mod fs;
pub mod math;

pub use error::{Error, Result};
pub use math::Aabb;

/// Engine-wide constants
pub mod constants {
    /// Number of frames the CPU may record ahead of the GPU.
    pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
}
