//! Mesh rendering pipeline for the Prism renderer.
//!
//! This crate provides:
//! - The POD vertex format and its attribute fallbacks
//! - Typed mesh and texture containers
//! - Camera and view management
//! - Graphics pipelines for static and skinned meshes
//! - Joint palette computation for skeletal animation

pub mod camera;
pub mod mesh;
pub mod mesh_pipeline;
pub mod skinning;
pub mod texture;
pub mod vertex;

pub use camera::{Camera, CameraUniforms};
pub use mesh::Mesh;
pub use mesh_pipeline::{MeshPipeline, ModelPush, PipelineKind};
pub use skinning::joint_matrices;
pub use texture::Texture;
pub use vertex::Vertex;
