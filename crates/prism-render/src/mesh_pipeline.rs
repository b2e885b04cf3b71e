//! Graphics pipelines for static and skinned meshes.

use crate::vertex::Vertex;
use ash::vk;
use bytemuck::{Pod, Zeroable};
use prism_gpu::descriptors::DescriptorSetLayoutBuilder;
use prism_gpu::pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
use prism_gpu::Result;

/// Which vertex path a mesh pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Plain model-matrix transform.
    Static,
    /// Joint-palette skinning in the vertex stage.
    Skinned,
}

/// Per-draw push constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ModelPush {
    pub model: [[f32; 4]; 4],
}

/// Pipeline for drawing meshes, with its descriptor set layout.
///
/// Set 0 bindings: 0 = camera uniforms (vertex), 1 = base color sampler
/// (fragment), 2 = joint matrices storage buffer (vertex, skinned only).
pub struct MeshPipeline {
    pub pipeline: GraphicsPipeline,
    pub set_layout: vk::DescriptorSetLayout,
    pub kind: PipelineKind,
}

impl MeshPipeline {
    /// Create a mesh pipeline targeting the given attachment formats.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        color_format: vk::Format,
        depth_format: Option<vk::Format>,
        kind: PipelineKind,
    ) -> Result<Self> {
        let mut layout_builder = DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .sampled_image(1, vk::ShaderStageFlags::FRAGMENT);
        if kind == PipelineKind::Skinned {
            layout_builder = layout_builder.storage_buffer(2, vk::ShaderStageFlags::VERTEX);
        }
        let set_layout = layout_builder.build(device)?;

        let vertex_shader = match kind {
            PipelineKind::Static => prism_shaders::mesh_vertex_shader(),
            PipelineKind::Skinned => prism_shaders::skinned_vertex_shader(),
        };

        let config = GraphicsPipelineConfig {
            vertex_shader: vertex_shader.to_vec(),
            fragment_shader: prism_shaders::mesh_fragment_shader().to_vec(),
            vertex_bindings: vec![Vertex::binding_description()],
            vertex_attributes: Vertex::attribute_descriptions(),
            color_formats: vec![color_format],
            depth_format,
            ..Default::default()
        };

        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .offset(0)
            .size(std::mem::size_of::<ModelPush>() as u32)];

        let pipeline =
            GraphicsPipeline::new(device, &config, &[set_layout], &push_constant_ranges)?;

        Ok(Self {
            pipeline,
            set_layout,
            kind,
        })
    }

    /// Bind the pipeline and push the model matrix.
    ///
    /// # Safety
    /// The device and command buffer must be valid and recording.
    pub unsafe fn bind(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        descriptor_set: vk::DescriptorSet,
        push: &ModelPush,
    ) {
        device.cmd_bind_pipeline(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline.pipeline,
        );
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline.layout,
            0,
            &[descriptor_set],
            &[],
        );
        device.cmd_push_constants(
            cmd,
            self.pipeline.layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            bytemuck::bytes_of(push),
        );
    }

    /// Destroy the pipeline and its layout.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        self.pipeline.destroy(device);
        device.destroy_descriptor_set_layout(self.set_layout, None);
    }
}
