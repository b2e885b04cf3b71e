//! Sampled 2D textures.

use ash::vk;
use prism_core::checked;
use prism_gpu::command::CommandRecycler;
use prism_gpu::memory::{GpuAllocator, GpuImage};
use prism_gpu::resource::TransferBuffer;
use prism_gpu::{GpuError, Result};

/// A sampled RGBA8 texture with its view and sampler.
pub struct Texture {
    image: GpuImage,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    width: u32,
    height: u32,
}

impl Texture {
    /// Upload RGBA8 pixels into a device-local sampled texture.
    ///
    /// The copy goes through a staging buffer and a recycled one-time
    /// command buffer; the call blocks until the upload completes, so the
    /// staging buffer is freed before returning.
    ///
    /// # Safety
    /// All handles must be valid.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn upload(
        device: &ash::Device,
        allocator: &mut GpuAllocator,
        recycler: &mut CommandRecycler,
        queue: vk::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        name: &str,
    ) -> Result<Self> {
        let expected = checked::byte_size(
            checked::mul(width as usize, height as usize).ok_or(GpuError::TooLarge("pixels"))?,
            4,
        )
        .ok_or(GpuError::TooLarge("pixels"))?;
        if pixels.len() as u64 != expected {
            return Err(GpuError::InvalidState(format!(
                "texture {name}: got {} bytes, expected {expected}",
                pixels.len()
            )));
        }

        // Stage the pixel data
        let staging = TransferBuffer::new(allocator, expected, &format!("{name}_staging"))?;
        staging.write_bytes(0, pixels)?;

        // Create the target image
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_SRGB)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = allocator.create_image(&image_info, gpu_allocator::MemoryLocation::GpuOnly, name)?;

        // Record transition, copy, transition on a recycled buffer
        let cmds = recycler.acquire(device)?;
        let cmd = cmds.buffer();

        image_barrier(
            device,
            cmd,
            image.image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
        );

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(1),
            )
            .image_extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            });

        device.cmd_copy_buffer_to_image(
            cmd,
            staging.handle(),
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        image_barrier(
            device,
            cmd,
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
        );

        recycler.submit_and_wait(device, queue, cmds)?;

        // Upload finished; the staging buffer is no longer referenced
        staging.destroy(allocator)?;

        Self::from_image(device, image, width, height)
    }

    /// Wrap an already-uploaded image (in SHADER_READ_ONLY layout) with a
    /// view and sampler.
    ///
    /// # Safety
    /// The device must be valid and the image must be in the
    /// SHADER_READ_ONLY_OPTIMAL layout.
    pub unsafe fn from_image(
        device: &ash::Device,
        image: GpuImage,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = device.create_image_view(&view_info, None)?;

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);
        let sampler = device.create_sampler(&sampler_info, None)?;

        Ok(Self {
            image,
            view,
            sampler,
            width,
            height,
        })
    }

    /// A 1x1 opaque white texture for untextured materials.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn white(
        device: &ash::Device,
        allocator: &mut GpuAllocator,
        recycler: &mut CommandRecycler,
        queue: vk::Queue,
    ) -> Result<Self> {
        Self::upload(
            device,
            allocator,
            recycler,
            queue,
            1,
            1,
            &[255, 255, 255, 255],
            "white",
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Free the texture. Consumes the wrapper.
    ///
    /// # Safety
    /// The device must be valid and the texture must not be in use.
    pub unsafe fn destroy(
        mut self,
        device: &ash::Device,
        allocator: &mut GpuAllocator,
    ) -> Result<()> {
        device.destroy_sampler(self.sampler, None);
        device.destroy_image_view(self.view, None);
        allocator.free_image(&mut self.image)
    }
}

/// Record a full-subresource layout transition.
///
/// # Safety
/// The device and command buffer must be valid and recording.
#[allow(clippy::too_many_arguments)]
pub unsafe fn image_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    device.cmd_pipeline_barrier(
        cmd,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}
