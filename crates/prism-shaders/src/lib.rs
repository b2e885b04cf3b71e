//! Shader compilation for the Prism renderer.
//!
//! This crate contains GLSL shaders and their compiled SPIR-V bytecode.
//! Shaders are compiled at build time using shaderc.

use std::sync::OnceLock;

/// Embedded SPIR-V shader bytecode (raw bytes, may not be aligned).
mod spirv_bytes {
    /// Static mesh vertex shader (compiled SPIR-V).
    pub static MESH_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/mesh_vert.spv"));
    /// Skinned mesh vertex shader (compiled SPIR-V).
    pub static SKINNED_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/skinned_vert.spv"));
    /// Mesh fragment shader (compiled SPIR-V).
    pub static MESH_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/mesh_frag.spv"));
}

/// Convert byte slice to aligned u32 Vec (SPIR-V requires 4-byte alignment).
fn bytes_to_spirv(bytes: &[u8]) -> Vec<u32> {
    assert!(
        bytes.len() % 4 == 0,
        "SPIR-V bytecode must be 4-byte aligned"
    );
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

static MESH_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static SKINNED_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static MESH_FRAG_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();

/// Get the static mesh vertex shader as a u32 slice for Vulkan.
pub fn mesh_vertex_shader() -> &'static [u32] {
    MESH_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::MESH_VERT))
}

/// Get the skinned mesh vertex shader as a u32 slice for Vulkan.
pub fn skinned_vertex_shader() -> &'static [u32] {
    SKINNED_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::SKINNED_VERT))
}

/// Get the mesh fragment shader as a u32 slice for Vulkan.
pub fn mesh_fragment_shader() -> &'static [u32] {
    MESH_FRAG_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::MESH_FRAG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaders_have_valid_magic() {
        for shader in [
            mesh_vertex_shader(),
            skinned_vertex_shader(),
            mesh_fragment_shader(),
        ] {
            assert_eq!(shader[0], 0x0723_0203, "Invalid SPIR-V magic number");
            assert!(shader.len() > 20, "Shader suspiciously small");
        }
    }
}
