//! Asset import error types.

use thiserror::Error;

/// Errors produced while importing or uploading an asset.
///
/// These abort the current import operation, never the process.
#[derive(Error, Debug)]
pub enum AssetError {
    /// I/O error reading the asset.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The glTF parser rejected the document.
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    /// Only triangle lists are supported.
    #[error("Unsupported primitive topology: {0:?}")]
    UnsupportedTopology(gltf::mesh::Mode),

    /// A primitive without positions cannot be rendered.
    #[error("Primitive has no position attribute")]
    MissingPositions,

    /// A count or size computation overflowed.
    #[error("too many {0}")]
    TooMany(&'static str),

    /// GPU-side upload failure.
    #[error("GPU error: {0}")]
    Gpu(#[from] prism_gpu::GpuError),

    /// Malformed or unsupported asset content.
    #[error("Invalid asset: {0}")]
    Invalid(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, AssetError>;
