//! The vertex format shared by every mesh in the renderer.

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// A single mesh vertex.
///
/// Attributes an asset does not provide are filled with the documented
/// fallback constants so one layout serves static and skinned meshes
/// alike.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

impl Vertex {
    /// Fallback normal: straight up.
    pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];
    /// Fallback texture coordinate: origin.
    pub const DEFAULT_TEX_COORD: [f32; 2] = [0.0, 0.0];
    /// Fallback color: opaque white.
    pub const DEFAULT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    /// Fallback joints: all root.
    pub const DEFAULT_JOINTS: [u16; 4] = [0, 0, 0, 0];
    /// Fallback weights: fully bound to the first joint.
    pub const DEFAULT_WEIGHTS: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

    /// A vertex at `position` with every other attribute defaulted.
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            normal: Self::DEFAULT_NORMAL,
            tex_coord: Self::DEFAULT_TEX_COORD,
            color: Self::DEFAULT_COLOR,
            joints: Self::DEFAULT_JOINTS,
            weights: Self::DEFAULT_WEIGHTS,
        }
    }

    /// Vertex input binding for pipeline creation.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    /// Vertex attribute layout for pipeline creation.
    pub fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription::default()
                .location(0)
                .binding(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::offset_of!(Self, position) as u32),
            vk::VertexInputAttributeDescription::default()
                .location(1)
                .binding(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::offset_of!(Self, normal) as u32),
            vk::VertexInputAttributeDescription::default()
                .location(2)
                .binding(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(std::mem::offset_of!(Self, tex_coord) as u32),
            vk::VertexInputAttributeDescription::default()
                .location(3)
                .binding(0)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(std::mem::offset_of!(Self, color) as u32),
            vk::VertexInputAttributeDescription::default()
                .location(4)
                .binding(0)
                .format(vk::Format::R16G16B16A16_UINT)
                .offset(std::mem::offset_of!(Self, joints) as u32),
            vk::VertexInputAttributeDescription::default()
                .location(5)
                .binding(0)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(std::mem::offset_of!(Self, weights) as u32),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        // The attribute offsets assume no padding
        assert_eq!(std::mem::size_of::<Vertex>(), 72);
    }

    #[test]
    fn defaults_fill_everything_but_position() {
        let v = Vertex::from_position([1.0, 2.0, 3.0]);
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        assert_eq!(v.tex_coord, [0.0, 0.0]);
        assert_eq!(v.color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(v.joints, [0, 0, 0, 0]);
        assert_eq!(v.weights, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn attributes_cover_all_fields() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs.len(), 6);
        let locations: Vec<u32> = attrs.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4, 5]);
    }
}
