//! Wave simulation application.

use ash::vk;
use glam::{Mat4, Vec3};
use tracing::error;

use crate::wave::{default_waves, fill_grid, grid_indices, Wave};
use prism_app::{App, Frame, WindowContext};
use prism_gpu::descriptors::{write_combined_image_sampler, write_uniform_buffer, DescriptorPool};
use prism_gpu::resource::{IndexBuffer, UniformBuffer, VertexBuffer};
use prism_render::{Camera, CameraUniforms, MeshPipeline, ModelPush, PipelineKind, Texture, Vertex};

/// Vertices per grid side.
const GRID_SIZE: usize = 128;

/// Distance between neighboring grid vertices.
const GRID_SPACING: f32 = 0.25;

/// Wave simulation state.
pub struct Waves {
    waves: Vec<Wave>,
    time: f32,
    cpu_vertices: Vec<Vertex>,
    vertex_buffer: Option<VertexBuffer<Vertex>>,
    index_buffer: Option<IndexBuffer<u32>>,
    index_count: u32,
    pipeline: MeshPipeline,
    descriptor_pool: DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    water_texture: Option<Texture>,
    camera_uniforms: Option<UniformBuffer<CameraUniforms>>,
    camera: Camera,
}

impl App for Waves {
    fn init(ctx: &mut WindowContext) -> anyhow::Result<Self> {
        let queue = ctx.gpu.graphics_queue();
        let color_format = ctx.color_format();
        let depth_format = ctx.depth_format();
        let aspect = ctx.aspect_ratio();

        let indices = grid_indices(GRID_SIZE);
        let index_count = indices.len() as u32;

        let (gpu, recycler) = ctx.upload_parts();
        let device = gpu.device();

        let (vertex_buffer, index_buffer, water_texture, camera_uniforms) = {
            let mut allocator = gpu.allocator().lock();

            let vertex_buffer = VertexBuffer::<Vertex>::host_visible(
                &mut allocator,
                GRID_SIZE * GRID_SIZE,
                "wave_grid_vertices",
            )?;

            let index_buffer = IndexBuffer::<u32>::host_visible(
                &mut allocator,
                indices.len(),
                "wave_grid_indices",
            )?;
            index_buffer.write(&indices)?;

            let water_texture = unsafe { Texture::white(device, &mut allocator, recycler, queue)? };
            let camera_uniforms =
                UniformBuffer::<CameraUniforms>::new(&mut allocator, "wave_camera")?;

            (vertex_buffer, index_buffer, water_texture, camera_uniforms)
        };

        let pipeline = unsafe {
            MeshPipeline::new(device, color_format, Some(depth_format), PipelineKind::Static)?
        };

        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1),
        ];
        let descriptor_pool = unsafe { DescriptorPool::new(device, 1, &pool_sizes)? };
        let descriptor_set = unsafe { descriptor_pool.allocate(device, &[pipeline.set_layout])?[0] };

        unsafe {
            write_uniform_buffer(
                device,
                descriptor_set,
                0,
                camera_uniforms.handle(),
                0,
                camera_uniforms.byte_size(),
            );
            write_combined_image_sampler(
                device,
                descriptor_set,
                1,
                water_texture.view,
                water_texture.sampler,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        }

        let extent = GRID_SIZE as f32 * GRID_SPACING;
        let camera = Camera::look_from(
            Vec3::new(0.0, extent * 0.35, extent * 0.55),
            Vec3::ZERO,
            aspect,
        );

        Ok(Self {
            waves: default_waves(),
            time: 0.0,
            cpu_vertices: Vec::with_capacity(GRID_SIZE * GRID_SIZE),
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
            index_count,
            pipeline,
            descriptor_pool,
            descriptor_set,
            water_texture: Some(water_texture),
            camera_uniforms: Some(camera_uniforms),
            camera,
        })
    }

    fn update(&mut self, ctx: &mut WindowContext, dt: f32) {
        self.time += dt;

        // Displace the whole grid on the CPU and push it to the GPU
        fill_grid(
            &mut self.cpu_vertices,
            &self.waves,
            GRID_SIZE,
            GRID_SPACING,
            self.time,
        );
        if let Some(buffer) = &self.vertex_buffer {
            if let Err(e) = buffer.write(&self.cpu_vertices) {
                error!("Failed to write wave vertices: {e}");
            }
        }

        self.camera.set_aspect(ctx.aspect_ratio());
        if let Some(uniforms) = &self.camera_uniforms {
            if let Err(e) = uniforms.write(&self.camera.uniforms()) {
                error!("Failed to write camera uniforms: {e}");
            }
        }
    }

    fn render(&mut self, frame: &mut Frame) -> anyhow::Result<()> {
        let device = frame.device();
        let cmd = frame.command_buffer();

        let (Some(vertex_buffer), Some(index_buffer)) =
            (&self.vertex_buffer, &self.index_buffer)
        else {
            return Ok(());
        };

        unsafe {
            frame.begin_rendering([0.02, 0.03, 0.06, 1.0]);

            self.pipeline.bind(
                device,
                cmd,
                self.descriptor_set,
                &ModelPush {
                    model: Mat4::IDENTITY.to_cols_array_2d(),
                },
            );
            device.cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer.handle()], &[0]);
            device.cmd_bind_index_buffer(
                cmd,
                index_buffer.handle(),
                0,
                index_buffer.index_type(),
            );
            device.cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);

            frame.end_rendering();
        }

        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut WindowContext) {
        let device = ctx.gpu.device();

        unsafe {
            self.pipeline.destroy(device);
            self.descriptor_pool.destroy(device);
        }

        let mut allocator = ctx.gpu.allocator().lock();
        if let Some(buffer) = self.vertex_buffer.take() {
            if let Err(e) = buffer.destroy(&mut allocator) {
                error!("Failed to destroy wave vertices: {e}");
            }
        }
        if let Some(buffer) = self.index_buffer.take() {
            if let Err(e) = buffer.destroy(&mut allocator) {
                error!("Failed to destroy wave indices: {e}");
            }
        }
        if let Some(texture) = self.water_texture.take() {
            if let Err(e) = unsafe { texture.destroy(device, &mut allocator) } {
                error!("Failed to destroy water texture: {e}");
            }
        }
        if let Some(uniforms) = self.camera_uniforms.take() {
            if let Err(e) = uniforms.destroy(&mut allocator) {
                error!("Failed to destroy camera uniforms: {e}");
            }
        }
    }
}
