//! Headless GPU harness.

use prism_gpu::command::CommandRecycler;
use prism_gpu::{GpuContext, GpuContextBuilder};

use crate::{Result, TestError};

/// A surfaceless GPU context plus a command recycler.
pub struct HeadlessGpu {
    pub context: GpuContext,
    pub recycler: CommandRecycler,
}

impl HeadlessGpu {
    /// Create a headless context with validation enabled.
    pub fn new() -> Result<Self> {
        let context = GpuContextBuilder::new()
            .app_name("prism-test")
            .validation(true)
            .build()
            .map_err(|e| TestError::Gpu(e.to_string()))?;

        let recycler =
            unsafe { CommandRecycler::new(context.device(), context.graphics_queue_family()) }
                .map_err(|e| TestError::Gpu(e.to_string()))?;

        Ok(Self { context, recycler })
    }

    /// Tear down, waiting for the device first.
    pub fn destroy(mut self) {
        let _ = self.context.wait_idle();
        unsafe {
            self.recycler.destroy(self.context.device());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // These run against a real Vulkan driver; enable with
    // `cargo test -- --ignored`.

    #[test]
    #[ignore]
    fn recycler_reuses_pairs_in_steady_state() {
        let mut gpu = HeadlessGpu::new().expect("needs a Vulkan driver");
        let device = gpu.context.device();
        let queue = gpu.context.graphics_queue();

        for _ in 0..64 {
            let cmds = unsafe { gpu.recycler.acquire(device) }.unwrap();
            unsafe { gpu.recycler.submit_and_wait(device, queue, cmds) }.unwrap();
        }

        // Serial submit-and-wait keeps exactly one pair in flight
        assert_eq!(gpu.recycler.allocated_pairs(), 1);
        gpu.destroy();
    }

    #[test]
    #[ignore]
    fn submit_and_wait_reclaims_to_front() {
        let mut gpu = HeadlessGpu::new().expect("needs a Vulkan driver");
        let device = gpu.context.device();
        let queue = gpu.context.graphics_queue();

        let cmds = unsafe { gpu.recycler.acquire(device) }.unwrap();
        unsafe { gpu.recycler.submit_and_wait(device, queue, cmds) }.unwrap();
        assert_eq!(gpu.recycler.flying_count(), 1);

        // The parked pair is known free: the next acquire must reuse it
        let cmds = unsafe { gpu.recycler.acquire(device) }.unwrap();
        assert_eq!(gpu.recycler.allocated_pairs(), 1);
        assert_eq!(gpu.recycler.flying_count(), 0);
        unsafe { gpu.recycler.submit(device, queue, cmds) }.unwrap();

        let _ = gpu.context.wait_idle();
        gpu.destroy();
    }

    #[test]
    #[ignore]
    fn submit_and_wait_timeout_reports_completion() {
        let mut gpu = HeadlessGpu::new().expect("needs a Vulkan driver");
        let device = gpu.context.device();
        let queue = gpu.context.transfer_queue();

        let cmds = unsafe { gpu.recycler.acquire(device) }.unwrap();
        let done = unsafe {
            gpu.recycler
                .submit_and_wait_timeout(device, queue, cmds, Duration::from_secs(5))
        }
        .unwrap();
        // An empty buffer finishes well within the deadline
        assert!(done);
        gpu.destroy();
    }
}
