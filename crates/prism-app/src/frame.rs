//! The per-presented-frame object.
//!
//! A [`Frame`] walks the presentation state machine: wait on the ring
//! slot's in-flight fence, acquire the next swapchain image, record a
//! layout transition, let the caller record draws, then submit and
//! present. Because it mutably borrows the [`WindowContext`], a second
//! live frame for the same window is a compile error.
//!
//! Submission and presentation run unconditionally: through
//! [`present`](Frame::present) on the happy path, or through `Drop`
//! during unwinding, where failures can only be logged.

use crate::context::WindowContext;
use ash::vk;
use prism_core::checked;
use prism_gpu::command::begin_command_buffer;
use prism_gpu::sync::reset_fence;
use prism_gpu::{GpuError, Result};

/// Driver-side bound for one image acquisition attempt, retried on
/// NOT_READY/TIMEOUT.
const ACQUIRE_TIMEOUT_NS: u64 = 100_000_000;

/// Context for the current frame being rendered.
///
/// Exactly one `Frame` is alive per window at a time, enforced by the
/// mutable borrow of the context.
pub struct Frame<'ctx> {
    ctx: &'ctx mut WindowContext,
    slot: usize,
    image_index: u32,
    dt: f32,
    presented: bool,
}

impl<'ctx> Frame<'ctx> {
    /// Acquire the next frame.
    ///
    /// Blocks until the ring slot's fence signals (indefinite wait,
    /// retried while the driver reports a timeout), then acquires the
    /// next presentable image in a busy-retry loop — the platform picks
    /// the image index, which need not match the ring index. A
    /// suboptimal surface is logged only; resize handling is not
    /// implemented.
    pub fn begin(ctx: &'ctx mut WindowContext) -> Result<Frame<'ctx>> {
        let slot = ctx.frame_index;

        let now = std::time::Instant::now();
        let dt = now.duration_since(ctx.last_frame_time).as_secs_f32();
        ctx.last_frame_time = now;

        let device = ctx.gpu.device();
        let slot_data = &ctx.slots[slot];

        unsafe {
            loop {
                match device.wait_for_fences(&[slot_data.in_flight], true, u64::MAX) {
                    Ok(()) => break,
                    Err(vk::Result::TIMEOUT) => continue,
                    Err(e) => return Err(GpuError::from(e)),
                }
            }
            reset_fence(device, slot_data.in_flight)?;

            let image_index = loop {
                match ctx.swapchain.acquire_next_image(
                    &ctx.surface.swapchain_loader,
                    slot_data.image_available,
                    ACQUIRE_TIMEOUT_NS,
                ) {
                    Ok((index, suboptimal)) => {
                        if suboptimal {
                            // TODO: recreate the swapchain on resize
                            tracing::warn!("Surface suboptimal at acquire");
                        }
                        break index;
                    }
                    Err(GpuError::Vulkan(vk::Result::NOT_READY | vk::Result::TIMEOUT)) => {
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            };

            device.reset_command_buffer(
                slot_data.command_buffer,
                vk::CommandBufferResetFlags::empty(),
            )?;
            begin_command_buffer(
                device,
                slot_data.command_buffer,
                vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            )?;

            // Nothing has touched the image this frame, so a
            // color-output-to-color-output barrier is sufficient.
            record_color_barrier(
                device,
                slot_data.command_buffer,
                ctx.swapchain.images[image_index as usize],
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::AccessFlags::empty(),
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            );

            Ok(Frame {
                ctx,
                slot,
                image_index,
                dt,
                presented: false,
            })
        }
    }

    /// The command buffer to record draws into.
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.ctx.slots[self.slot].command_buffer
    }

    /// Index of the acquired swapchain image.
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Seconds since the previous frame began.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The owning window context.
    pub fn context(&self) -> &WindowContext {
        self.ctx
    }

    /// The Vulkan device, for recording.
    pub fn device(&self) -> &ash::Device {
        self.ctx.gpu.device()
    }

    /// Begin dynamic rendering into the acquired image, clearing color
    /// and depth, and set the full-extent viewport and scissor.
    ///
    /// # Safety
    /// The command buffer must be recording.
    pub unsafe fn begin_rendering(&self, clear_color: [f32; 4]) {
        let device = self.ctx.gpu.device();
        let cmd = self.command_buffer();
        let extent = self.ctx.swapchain.extent;

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.ctx.swapchain.image_views[self.image_index as usize])
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color,
                },
            });

        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.ctx.depth_view)
            .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            });

        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment))
            .depth_attachment(&depth_attachment);

        device.cmd_begin_rendering(cmd, &rendering_info);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        device.cmd_set_viewport(cmd, 0, &[viewport]);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        device.cmd_set_scissor(cmd, 0, &[scissor]);
    }

    /// End dynamic rendering.
    ///
    /// # Safety
    /// Must pair with [`begin_rendering`](Self::begin_rendering).
    pub unsafe fn end_rendering(&self) {
        self.ctx
            .gpu
            .device()
            .cmd_end_rendering(self.command_buffer());
    }

    /// Submit the recorded work and present the image.
    ///
    /// This is the fallible twin of the `Drop` path; prefer it so
    /// presentation errors surface instead of being logged.
    pub fn present(mut self) -> Result<()> {
        self.presented = true;
        self.finish()
    }

    /// Transition to present, end, submit, present, advance the ring.
    fn finish(&mut self) -> Result<()> {
        let device = self.ctx.gpu.device();
        let slot_data = &self.ctx.slots[self.slot];
        let cmd = slot_data.command_buffer;
        let render_finished = self.ctx.render_finished[self.image_index as usize];

        unsafe {
            record_color_barrier(
                device,
                cmd,
                self.ctx.swapchain.images[self.image_index as usize],
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::ImageLayout::PRESENT_SRC_KHR,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::AccessFlags::empty(),
            );

            device.end_command_buffer(cmd)?;

            let wait_semaphores = [slot_data.image_available];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [render_finished];
            let command_buffers = [cmd];

            let submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers)
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .signal_semaphores(&signal_semaphores);

            device.queue_submit(
                self.ctx.gpu.graphics_queue(),
                &[submit_info],
                slot_data.in_flight,
            )?;

            let suboptimal = self.ctx.swapchain.present(
                &self.ctx.surface.swapchain_loader,
                self.ctx.gpu.graphics_queue(),
                self.image_index,
                &[render_finished],
            )?;
            if suboptimal {
                // TODO: recreate the swapchain on resize
                tracing::warn!("Surface suboptimal at present");
            }
        }

        self.ctx.frame_index = advance_frame_index(self.ctx.frame_index, self.ctx.slots.len());
        self.ctx.frame_count = self.ctx.frame_count.saturating_add(1);

        Ok(())
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if !self.presented {
            // Drop cannot propagate; the explicit present() path exists
            // for callers that need the error.
            if let Err(e) = self.finish() {
                tracing::error!("Frame submission failed during drop: {e}");
            }
        }
    }
}

/// Advance the ring index with wraparound.
///
/// An overflowing increment defaults the index back to 0 rather than
/// wrapping through undefined territory.
fn advance_frame_index(index: usize, ring_len: usize) -> usize {
    debug_assert!(ring_len > 0);
    checked::add(index, 1).map_or(0, |next| next % ring_len)
}

/// Record a color-aspect layout transition at the color-output stage.
unsafe fn record_color_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
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
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::constants::MAX_FRAMES_IN_FLIGHT;

    #[test]
    fn ring_index_wraps_to_start() {
        let mut index = 0;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            index = advance_frame_index(index, MAX_FRAMES_IN_FLIGHT);
        }
        assert_eq!(index, 0);
    }

    #[test]
    fn ring_index_never_exceeds_bound() {
        let mut index = 0;
        for _ in 0..100 {
            index = advance_frame_index(index, MAX_FRAMES_IN_FLIGHT);
            assert!(index < MAX_FRAMES_IN_FLIGHT);
        }
    }

    #[test]
    fn overflowing_increment_defaults_to_zero() {
        assert_eq!(advance_frame_index(usize::MAX, MAX_FRAMES_IN_FLIGHT), 0);
    }
}
