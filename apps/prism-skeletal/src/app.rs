//! Skeletal mesh viewer application.

use std::path::PathBuf;

use anyhow::Context as _;
use ash::vk;
use glam::{Mat4, Vec3};
use tracing::{error, info};

use prism_app::{App, Frame, WindowContext};
use prism_asset::{
    global_transforms, import_path, rest_pose, sample_animation, upload_asset, AnimationData,
    GpuAsset, NodeData, SkinData,
};
use prism_core::math::Aabb;
use prism_gpu::descriptors::{
    write_combined_image_sampler, write_storage_buffer, write_uniform_buffer, DescriptorPool,
};
use prism_gpu::resource::{StorageBuffer, UniformBuffer};
use prism_render::{
    joint_matrices, Camera, CameraUniforms, MeshPipeline, ModelPush, PipelineKind, Texture,
};

/// Skeletal viewer configuration from the command line.
fn model_from_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        if args[i].as_str() == "--model" && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        i += 1;
    }
    None
}

/// Skeletal viewer state.
pub struct Skeletal {
    asset: Option<GpuAsset>,
    nodes: Vec<NodeData>,
    skin: SkinData,
    clip: AnimationData,
    time: f32,
    joint_buffer: Option<StorageBuffer<Mat4>>,
    pipeline: MeshPipeline,
    descriptor_pool: DescriptorPool,
    texture_sets: Vec<vk::DescriptorSet>,
    fallback_set: vk::DescriptorSet,
    fallback_texture: Option<Texture>,
    camera: Camera,
    camera_uniforms: Option<UniformBuffer<CameraUniforms>>,
}

impl App for Skeletal {
    fn init(ctx: &mut WindowContext) -> anyhow::Result<Self> {
        let model = model_from_args()
            .context("the skeletal viewer needs a skinned glTF: --model <path>")?;
        let asset_data = import_path(&model)?;

        let skin = asset_data
            .skins
            .first()
            .cloned()
            .context("asset has no skin")?;
        let clip = asset_data
            .animations
            .first()
            .cloned()
            .context("asset has no animation")?;

        info!(
            "Playing clip {:?} ({:.2}s, {} joints)",
            clip.name.as_deref().unwrap_or("unnamed"),
            clip.duration,
            skin.joints.len()
        );

        let queue = ctx.gpu.graphics_queue();
        let max_buffer_size = ctx.gpu.capabilities().max_buffer_size;
        let color_format = ctx.color_format();
        let depth_format = ctx.depth_format();
        let aspect = ctx.aspect_ratio();

        let (gpu, recycler) = ctx.upload_parts();
        let device = gpu.device();

        let (asset, fallback_texture, camera_uniforms, joint_buffer) = {
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
            let camera_uniforms =
                UniformBuffer::<CameraUniforms>::new(&mut allocator, "skeletal_camera")?;
            let joint_buffer = StorageBuffer::<Mat4>::host_visible(
                &mut allocator,
                skin.joints.len(),
                "joint_matrices",
            )?;
            (asset, fallback, camera_uniforms, joint_buffer)
        };

        let pipeline = unsafe {
            MeshPipeline::new(device, color_format, Some(depth_format), PipelineKind::Skinned)?
        };

        let set_count = asset.textures.len() + 1;
        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(set_count as u32),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(set_count as u32),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_BUFFER)
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
                write_storage_buffer(
                    device,
                    *set,
                    2,
                    joint_buffer.handle(),
                    0,
                    joint_buffer.byte_size(),
                );
            }
        }

        let fallback_set = sets[set_count - 1];
        let texture_sets = sets;

        let bounds = asset
            .meshes
            .iter()
            .map(|m| m.mesh.bounds())
            .fold(Aabb::default(), |acc, b| acc.merge(&b));
        let radius = (bounds.radius() * 2.5).max(1.0);
        let camera = Camera::look_from(
            bounds.center() + Vec3::new(0.0, radius * 0.3, radius),
            bounds.center(),
            aspect,
        );

        Ok(Self {
            asset: Some(asset),
            nodes: asset_data.nodes,
            skin,
            clip,
            time: 0.0,
            joint_buffer: Some(joint_buffer),
            pipeline,
            descriptor_pool,
            texture_sets,
            fallback_set,
            fallback_texture: Some(fallback_texture),
            camera,
            camera_uniforms: Some(camera_uniforms),
        })
    }

    fn update(&mut self, ctx: &mut WindowContext, dt: f32) {
        // Loop the clip
        self.time += dt;
        if self.clip.duration > 0.0 {
            self.time %= self.clip.duration;
        }

        let mut pose = rest_pose(&self.nodes);
        sample_animation(&self.clip, self.time, &mut pose);
        let globals = global_transforms(&self.nodes, &pose);

        let joint_globals: Vec<Mat4> = self
            .skin
            .joints
            .iter()
            .map(|&node| globals.get(node).copied().unwrap_or(Mat4::IDENTITY))
            .collect();
        let palette = joint_matrices(&joint_globals, &self.skin.inverse_bind);

        if let Some(buffer) = &self.joint_buffer {
            if let Err(e) = buffer.write(&palette) {
                error!("Failed to write joint matrices: {e}");
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
        let push = ModelPush {
            model: Mat4::IDENTITY.to_cols_array_2d(),
        };

        unsafe {
            frame.begin_rendering([0.05, 0.04, 0.06, 1.0]);

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

    fn cleanup(&mut self, ctx: &mut WindowContext) {
        let device = ctx.gpu.device();

        unsafe {
            self.pipeline.destroy(device);
            self.descriptor_pool.destroy(device);
        }

        let mut allocator = ctx.gpu.allocator().lock();
        if let Some(asset) = self.asset.take() {
            if let Err(e) = unsafe { asset.destroy(device, &mut allocator) } {
                error!("Failed to destroy asset: {e}");
            }
        }
        if let Some(texture) = self.fallback_texture.take() {
            if let Err(e) = unsafe { texture.destroy(device, &mut allocator) } {
                error!("Failed to destroy fallback texture: {e}");
            }
        }
        if let Some(buffer) = self.joint_buffer.take() {
            if let Err(e) = buffer.destroy(&mut allocator) {
                error!("Failed to destroy joint matrices: {e}");
            }
        }
        if let Some(uniforms) = self.camera_uniforms.take() {
            if let Err(e) = uniforms.destroy(&mut allocator) {
                error!("Failed to destroy camera uniforms: {e}");
            }
        }
    }
}
