//! Window context: the owner of everything presentation needs.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use gpu_allocator::MemoryLocation;
use prism_core::constants::MAX_FRAMES_IN_FLIGHT;
use prism_gpu::command::{CommandPool, CommandRecycler};
use prism_gpu::memory::GpuImage;
use prism_gpu::swapchain::Swapchain;
use prism_gpu::sync::{create_fence, create_semaphore};
use prism_gpu::{GpuContext, SurfaceContext};
use winit::window::Window;

/// Per-in-flight-slot synchronization primitives.
pub(crate) struct FrameSlot {
    /// Signaled when the slot's swapchain image is acquired.
    pub image_available: vk::Semaphore,
    /// Signaled when the slot's submitted work completes.
    pub in_flight: vk::Fence,
    /// Primary command buffer recorded by the slot's frame.
    pub command_buffer: vk::CommandBuffer,
}

/// Owner of the window, GPU context, swapchain, synchronization rings,
/// and the shared command-buffer recycler.
///
/// Created once at startup; [`cleanup`](Self::cleanup) waits for the
/// device to go idle before destroying anything, as GPU resources cannot
/// be freed while in use.
pub struct WindowContext {
    /// The window handle.
    pub window: Arc<Window>,
    /// GPU context with device and queues.
    pub gpu: GpuContext,
    /// Surface context for windowed rendering.
    pub surface: SurfaceContext,
    /// Current swapchain.
    pub swapchain: Swapchain,
    /// Depth attachment matching the swapchain extent.
    pub(crate) depth_image: GpuImage,
    pub(crate) depth_view: vk::ImageView,
    /// Pool for the per-slot frame command buffers.
    pub(crate) command_pool: CommandPool,
    /// Recycler for one-time-submit command buffers (uploads etc.).
    pub(crate) recycler: CommandRecycler,
    /// Per-slot synchronization, `MAX_FRAMES_IN_FLIGHT` entries.
    pub(crate) slots: Vec<FrameSlot>,
    /// Per-swapchain-image render-complete semaphores.
    pub(crate) render_finished: Vec<vk::Semaphore>,
    /// Ring index of the slot the next frame will use.
    pub(crate) frame_index: usize,
    /// Total frames presented.
    pub frame_count: u64,
    /// Time of last frame, for delta time calculation.
    pub(crate) last_frame_time: Instant,
    /// Whether vsync is enabled.
    pub vsync: bool,
}

impl WindowContext {
    /// Create a new window context.
    ///
    /// # Safety
    /// The window must have valid handles.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        gpu: GpuContext,
        vsync: bool,
    ) -> anyhow::Result<Self> {
        let surface = SurfaceContext::from_window(&gpu, window.as_ref())?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let swapchain = surface.create_swapchain(&gpu, width, height, vsync)?;

        tracing::info!(
            "Swapchain created: {}x{} ({} images)",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len()
        );

        let (depth_image, depth_view) = create_depth_attachment(&gpu, swapchain.extent)?;

        let command_pool = CommandPool::new(
            gpu.device(),
            gpu.graphics_queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;

        let mut recycler = CommandRecycler::new(gpu.device(), gpu.graphics_queue_family())?;

        // The depth attachment keeps DEPTH_ATTACHMENT_OPTIMAL layout for
        // its whole life; transition it once here.
        transition_depth(&gpu, &mut recycler, depth_image.image)?;

        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let command_buffer =
                command_pool.allocate_command_buffer(gpu.device(), vk::CommandBufferLevel::PRIMARY)?;
            slots.push(FrameSlot {
                image_available: create_semaphore(gpu.device())?,
                // Signaled so the first frame's wait returns immediately
                in_flight: create_fence(gpu.device(), true)?,
                command_buffer,
            });
        }

        let mut render_finished = Vec::with_capacity(swapchain.images.len());
        for _ in 0..swapchain.images.len() {
            render_finished.push(create_semaphore(gpu.device())?);
        }

        Ok(Self {
            window,
            gpu,
            surface,
            swapchain,
            depth_image,
            depth_view,
            command_pool,
            recycler,
            slots,
            render_finished,
            frame_index: 0,
            frame_count: 0,
            last_frame_time: Instant::now(),
            vsync,
        })
    }

    /// Get the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Get the swapchain color format.
    pub fn color_format(&self) -> vk::Format {
        self.swapchain.format
    }

    /// The depth attachment format.
    pub fn depth_format(&self) -> vk::Format {
        self.depth_image.format
    }

    /// Get the aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        self.swapchain.extent.width as f32 / self.swapchain.extent.height as f32
    }

    /// Ring index of the slot the next frame will use.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Access the shared one-time command buffer recycler.
    pub fn recycler_mut(&mut self) -> &mut CommandRecycler {
        &mut self.recycler
    }

    /// Borrow the GPU context and recycler together, for uploads that
    /// need the allocator lock and the recycler at the same time.
    pub fn upload_parts(&mut self) -> (&GpuContext, &mut CommandRecycler) {
        (&self.gpu, &mut self.recycler)
    }

    /// Fences of all in-flight slots, for shared-resource release gates.
    pub fn in_flight_fences(&self) -> Vec<vk::Fence> {
        self.slots.iter().map(|s| s.in_flight).collect()
    }

    /// Cleanup all resources.
    ///
    /// Waits for the device to go idle first; GPU resources cannot be
    /// freed while in use.
    pub(crate) fn cleanup(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            tracing::error!("Failed to wait for device idle: {e}");
        }

        let device = self.gpu.device();
        unsafe {
            for slot in &self.slots {
                device.destroy_semaphore(slot.image_available, None);
                device.destroy_fence(slot.in_flight, None);
            }
            self.slots.clear();

            for sem in &self.render_finished {
                device.destroy_semaphore(*sem, None);
            }
            self.render_finished.clear();

            self.recycler.destroy(device);
            self.command_pool.destroy(device);

            device.destroy_image_view(self.depth_view, None);
        }

        if let Err(e) = self
            .gpu
            .allocator()
            .lock()
            .free_image(&mut self.depth_image)
        {
            tracing::error!("Failed to free depth attachment: {e}");
        }

        unsafe {
            self.swapchain
                .destroy(self.gpu.device(), &self.surface.swapchain_loader);
            self.surface.destroy();
        }
    }
}

/// Create the depth image and view for the given extent.
unsafe fn create_depth_attachment(
    gpu: &GpuContext,
    extent: vk::Extent2D,
) -> anyhow::Result<(GpuImage, vk::ImageView)> {
    let image_info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(vk::Format::D32_SFLOAT)
        .extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED);

    let image = gpu
        .allocator()
        .lock()
        .create_image(&image_info, MemoryLocation::GpuOnly, "depth")?;

    let view_info = vk::ImageViewCreateInfo::default()
        .image(image.image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(vk::Format::D32_SFLOAT)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::DEPTH)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );
    let view = gpu.device().create_image_view(&view_info, None)?;

    Ok((image, view))
}

/// Transition the depth image into its permanent attachment layout.
unsafe fn transition_depth(
    gpu: &GpuContext,
    recycler: &mut CommandRecycler,
    image: vk::Image,
) -> anyhow::Result<()> {
    let device = gpu.device();
    let cmds = recycler.acquire(device)?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::DEPTH)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    device.cmd_pipeline_barrier(
        cmds.buffer(),
        vk::PipelineStageFlags::TOP_OF_PIPE,
        vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );

    recycler.submit_and_wait(device, gpu.graphics_queue(), cmds)?;
    Ok(())
}
