//! glTF 2.0 import and GPU upload for the Prism renderer.
//!
//! The importer is split in two stages:
//! - [`import`]: parse a glTF document into CPU-side mesh, image, skin
//!   and animation data, filling absent vertex attributes with the
//!   renderer's documented fallbacks.
//! - [`upload`]: batch all byte ranges into a minimal set of staging
//!   buffers (planned by [`staging`]) and copy them to device-local
//!   resources through one shared one-time command buffer, blocking
//!   until the upload completes.

pub mod animation;
pub mod error;
pub mod import;
pub mod staging;
pub mod upload;

pub use animation::{global_transforms, rest_pose, sample_animation, LocalTransform};
pub use error::{AssetError, Result};
pub use import::{
    import_path, import_slice, AnimationData, ChannelData, ChannelValues, ImageData,
    ImportedAsset, IndexData, Interpolation, MeshData, NodeData, SkinData,
};
pub use staging::{plan_staging, StagingPlan};
pub use upload::{upload_asset, AnyMesh, GpuAsset};
