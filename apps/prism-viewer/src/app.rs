//! Viewer application implementation.

use std::path::PathBuf;

use ash::vk;
use glam::{Mat4, Vec3};
use tracing::info;

use prism_app::{App, Frame, WindowContext, WindowEvent};
use prism_asset::{import_path, upload_asset, GpuAsset, ImportedAsset, IndexData, MeshData};
use prism_core::math::Aabb;
use prism_gpu::descriptors::{write_combined_image_sampler, write_uniform_buffer, DescriptorPool};
use prism_gpu::resource::UniformBuffer;
use prism_input::{InputState, KeyCode, MouseButton};
use prism_render::{Camera, CameraUniforms, MeshPipeline, ModelPush, PipelineKind, Texture, Vertex};

/// Mouse sensitivity for orbiting (radians per pixel).
const MOUSE_SENSITIVITY: f32 = 0.005;

/// Keyboard orbit speed (radians per second).
const KEY_ORBIT_SPEED: f32 = 1.5;

/// Viewer configuration from the command line.
#[derive(Debug, Clone, Default)]
pub struct ViewerParams {
    pub model: Option<PathBuf>,
}

impl ViewerParams {
    /// Parse parameters from command line arguments.
    pub fn from_args() -> Self {
        let mut params = Self::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            if args[i].as_str() == "--model" {
                if i + 1 < args.len() {
                    params.model = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            i += 1;
        }

        params
    }
}

/// Built-in fallback scene: a single triangle.
fn default_triangle() -> ImportedAsset {
    let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let mut bounds = Aabb::default();
    let vertices = positions
        .iter()
        .map(|&p| {
            bounds.expand_to_include(Vec3::from_array(p));
            Vertex::from_position(p)
        })
        .collect();

    ImportedAsset {
        meshes: vec![MeshData {
            name: Some("triangle".to_string()),
            vertices,
            indices: IndexData::U16(vec![0, 1, 2]),
            base_color_image: None,
            bounds,
        }],
        ..Default::default()
    }
}

/// Viewer application state.
pub struct Viewer {
    asset: Option<GpuAsset>,
    pipeline: MeshPipeline,
    descriptor_pool: DescriptorPool,
    /// One set per asset texture, then the fallback set last.
    texture_sets: Vec<vk::DescriptorSet>,
    fallback_set: vk::DescriptorSet,
    fallback_texture: Option<Texture>,
    camera: Camera,
    camera_uniforms: Option<UniformBuffer<CameraUniforms>>,
    input: InputState,
    orbit_target: Vec3,
    orbit_yaw: f32,
    orbit_pitch: f32,
    orbit_radius: f32,
}

impl App for Viewer {
    fn init(ctx: &mut WindowContext) -> anyhow::Result<Self> {
        let params = ViewerParams::from_args();

        let asset_data = match &params.model {
            Some(path) => import_path(path)?,
            None => {
                info!("No --model given; showing the built-in triangle");
                default_triangle()
            }
        };

        let queue = ctx.gpu.graphics_queue();
        let max_buffer_size = ctx.gpu.capabilities().max_buffer_size;
        let color_format = ctx.color_format();
        let depth_format = ctx.depth_format();
        let aspect = ctx.aspect_ratio();

        let (gpu, recycler) = ctx.upload_parts();
        let device = gpu.device();

        let (asset, fallback_texture, camera_uniforms) = {
            let mut allocator = gpu.allocator().lock();
            let asset = unsafe {
                upload_asset(
                    device,
                    &mut allocator,
                    recycler,
                    queue,
                    max_buffer_size,
                    &asset_data,
                )?
            };
            let fallback = unsafe { Texture::white(device, &mut allocator, recycler, queue)? };
            let camera_uniforms = UniformBuffer::<CameraUniforms>::new(&mut allocator, "camera")?;
            (asset, fallback, camera_uniforms)
        };

        let pipeline = unsafe {
            MeshPipeline::new(device, color_format, Some(depth_format), PipelineKind::Static)?
        };

        // One descriptor set per texture plus the fallback
        let set_count = asset.textures.len() + 1;
        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(set_count as u32),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(set_count as u32),
        ];
        let descriptor_pool =
            unsafe { DescriptorPool::new(device, set_count as u32, &pool_sizes)? };

        let layouts = vec![pipeline.set_layout; set_count];
        let sets = unsafe { descriptor_pool.allocate(device, &layouts)? };

        for (set, texture) in sets
            .iter()
            .zip(asset.textures.iter().chain(std::iter::once(&fallback_texture)))
        {
            unsafe {
                write_uniform_buffer(
                    device,
                    *set,
                    0,
                    camera_uniforms.handle(),
                    0,
                    camera_uniforms.byte_size(),
                );
                write_combined_image_sampler(
                    device,
                    *set,
                    1,
                    texture.view,
                    texture.sampler,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                );
            }
        }

        let fallback_set = sets[set_count - 1];
        let texture_sets = sets;

        // Frame the whole asset
        let bounds = asset
            .meshes
            .iter()
            .map(|m| m.mesh.bounds())
            .fold(Aabb::default(), |acc, b| acc.merge(&b));
        let orbit_target = bounds.center();
        let orbit_radius = (bounds.radius() * 2.5).max(0.5);

        let mut camera = Camera::default();
        camera.set_aspect(aspect);

        info!(
            "Viewing {} meshes ({} textures)",
            asset.meshes.len(),
            asset.textures.len()
        );

        Ok(Self {
            asset: Some(asset),
            pipeline,
            descriptor_pool,
            texture_sets,
            fallback_set,
            fallback_texture: Some(fallback_texture),
            camera,
            camera_uniforms: Some(camera_uniforms),
            input: InputState::new(),
            orbit_target,
            orbit_yaw: 0.6,
            orbit_pitch: 0.4,
            orbit_radius,
        })
    }

    fn update(&mut self, ctx: &mut WindowContext, dt: f32) {
        if self.input.mouse.is_pressed(MouseButton::Left) {
            let delta = self.input.mouse.delta();
            self.orbit_yaw -= delta.x * MOUSE_SENSITIVITY;
            self.orbit_pitch += delta.y * MOUSE_SENSITIVITY;
        }

        if self.input.keyboard.is_pressed(KeyCode::ArrowLeft) {
            self.orbit_yaw -= KEY_ORBIT_SPEED * dt;
        }
        if self.input.keyboard.is_pressed(KeyCode::ArrowRight) {
            self.orbit_yaw += KEY_ORBIT_SPEED * dt;
        }
        if self.input.keyboard.is_pressed(KeyCode::ArrowUp) {
            self.orbit_pitch += KEY_ORBIT_SPEED * dt;
        }
        if self.input.keyboard.is_pressed(KeyCode::ArrowDown) {
            self.orbit_pitch -= KEY_ORBIT_SPEED * dt;
        }

        let zoom = self.input.mouse.scroll_delta();
        if zoom != 0.0 {
            self.orbit_radius = (self.orbit_radius * (1.0 - zoom * 0.1)).max(0.1);
        }

        self.camera.set_aspect(ctx.aspect_ratio());
        self.camera.orbit(
            self.orbit_target,
            self.orbit_yaw,
            self.orbit_pitch,
            self.orbit_radius,
        );

        if let Some(uniforms) = &self.camera_uniforms {
            if let Err(e) = uniforms.write(&self.camera.uniforms()) {
                tracing::error!("Failed to write camera uniforms: {e}");
            }
        }

        self.input.end_frame();
    }

    fn render(&mut self, frame: &mut Frame) -> anyhow::Result<()> {
        let device = frame.device();
        let cmd = frame.command_buffer();
        let push = ModelPush {
            model: Mat4::IDENTITY.to_cols_array_2d(),
        };

        unsafe {
            frame.begin_rendering([0.04, 0.04, 0.07, 1.0]);

            if let Some(asset) = &self.asset {
                for gpu_mesh in &asset.meshes {
                    let set = gpu_mesh
                        .base_color
                        .and_then(|i| self.texture_sets.get(i).copied())
                        .unwrap_or(self.fallback_set);
                    self.pipeline.bind(device, cmd, set, &push);
                    gpu_mesh.mesh.draw(device, cmd);
                }
            }

            frame.end_rendering();
        }

        Ok(())
    }

    fn on_event(&mut self, event: &WindowEvent) -> bool {
        self.input.process_window_event(event)
    }

    fn cleanup(&mut self, ctx: &mut WindowContext) {
        let device = ctx.gpu.device();

        unsafe {
            self.pipeline.destroy(device);
            self.descriptor_pool.destroy(device);
        }

        let mut allocator = ctx.gpu.allocator().lock();
        if let Some(asset) = self.asset.take() {
            if let Err(e) = unsafe { asset.destroy(device, &mut allocator) } {
                tracing::error!("Failed to destroy asset: {e}");
            }
        }
        if let Some(texture) = self.fallback_texture.take() {
            if let Err(e) = unsafe { texture.destroy(device, &mut allocator) } {
                tracing::error!("Failed to destroy fallback texture: {e}");
            }
        }
        if let Some(uniforms) = self.camera_uniforms.take() {
            if let Err(e) = uniforms.destroy(&mut allocator) {
                tracing::error!("Failed to destroy camera uniforms: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_triangle_matches_viewer_expectations() {
        let asset = default_triangle();
        assert_eq!(asset.meshes.len(), 1);
        assert_eq!(asset.meshes[0].vertices.len(), 3);
        assert_eq!(asset.meshes[0].indices.len(), 3);
        assert!(matches!(asset.meshes[0].indices, IndexData::U16(_)));
    }
}
