//! Command buffer management.
//!
//! Besides the plain [`CommandPool`], this module provides the
//! [`CommandRecycler`]: a source of short-lived one-time-submit command
//! buffers for work outside the frame loop (asset uploads, layout
//! transitions). Submitted buffers are parked on a double-ended "flying"
//! list together with their fences and reclaimed on a later acquire once
//! their fence has signaled, so steady-state use allocates nothing.

use crate::error::{GpuError, Result};
use crate::sync::{create_fence, reset_fence};
use ash::vk;
use prism_core::checked;
use std::collections::VecDeque;
use std::time::Duration;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(
        device: &ash::Device,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = device.create_command_pool(&create_info, None)?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate a single primary command buffer.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffer(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
    ) -> Result<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(1);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers[0])
    }

    /// Allocate multiple command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffers(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(count);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers)
    }

    /// Destroy the command pool.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_command_pool(self.pool, None);
    }
}

/// Begin recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn begin_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    device.begin_command_buffer(cmd, &begin_info)?;
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    device.end_command_buffer(cmd)?;
    Ok(())
}

/// Submit command buffers to a queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    device.queue_submit(queue, &[submit_info], fence)?;
    Ok(())
}

/// A one-time-submit command buffer handed out by the recycler.
///
/// The buffer is in the recording state. Finish it with one of the
/// recycler's `submit*` methods, which take it back.
pub struct OneTimeCommands {
    cmd: vk::CommandBuffer,
    fence: vk::Fence,
}

impl OneTimeCommands {
    /// The command buffer to record into.
    pub fn buffer(&self) -> vk::CommandBuffer {
        self.cmd
    }
}

/// A submitted buffer whose completion is not yet known.
#[derive(Debug)]
struct InFlight {
    cmd: vk::CommandBuffer,
    fence: vk::Fence,
}

/// How a blocking wait on a submitted buffer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// The fence signaled; the pair is known free.
    Signaled,
    /// The deadline passed first; the pair is still flying.
    TimedOut,
    /// The wait itself failed; the pair's true status is unknown.
    Failed,
}

/// Recycler for one-time-submit command buffers.
///
/// Buffers and fences handed out by [`acquire`](Self::acquire) are never
/// returned to the driver while flying; they are freed only by
/// [`destroy`](Self::destroy) when the owning context shuts down.
pub struct CommandRecycler {
    pool: CommandPool,
    flying: VecDeque<InFlight>,
    /// Distinct buffer+fence pairs ever allocated.
    allocated: usize,
}

impl CommandRecycler {
    /// Create a recycler drawing from a fresh pool on the given family.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let pool = CommandPool::new(
            device,
            queue_family,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;

        Ok(Self {
            pool,
            flying: VecDeque::new(),
            allocated: 0,
        })
    }

    /// Number of distinct buffer+fence pairs ever allocated.
    ///
    /// Bounded by the maximum number of buffers simultaneously in flight.
    pub fn allocated_pairs(&self) -> usize {
        self.allocated
    }

    /// Number of submitted buffers not yet reclaimed.
    pub fn flying_count(&self) -> usize {
        self.flying.len()
    }

    /// Hand out a command buffer ready to record.
    ///
    /// Scans the flying list front to back, polling each fence without
    /// blocking; the first signaled entry is reset and reused. Only when
    /// nothing has finished is a new pair allocated.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn acquire(&mut self, device: &ash::Device) -> Result<OneTimeCommands> {
        let reclaimed = take_signaled(&mut self.flying, |fence| {
            device.get_fence_status(fence).map_err(GpuError::from)
        })?;

        let (cmd, fence) = match reclaimed {
            Some(entry) => {
                reset_fence(device, entry.fence)?;
                device.reset_command_buffer(entry.cmd, vk::CommandBufferResetFlags::empty())?;
                (entry.cmd, entry.fence)
            }
            None => {
                let fence = create_fence(device, false)?;
                let cmd = self
                    .pool
                    .allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY)?;
                self.allocated += 1;
                (cmd, fence)
            }
        };

        begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

        Ok(OneTimeCommands { cmd, fence })
    }

    /// End recording and submit asynchronously.
    ///
    /// The pair joins the back of the flying list and will be reclaimed
    /// by a later acquire once its fence signals.
    ///
    /// # Safety
    /// The device and queue must be valid.
    pub unsafe fn submit(
        &mut self,
        device: &ash::Device,
        queue: vk::Queue,
        cmds: OneTimeCommands,
    ) -> Result<()> {
        let entry = self.submit_inner(device, queue, cmds)?;
        self.flying.push_back(entry);
        Ok(())
    }

    /// End recording, submit, and block until the work completes.
    ///
    /// Always returns having parked the pair at the front of the flying
    /// list: its fence is known signaled, so the next acquire finds it
    /// first. The wait is retried while the driver reports a timeout.
    ///
    /// # Safety
    /// The device and queue must be valid.
    pub unsafe fn submit_and_wait(
        &mut self,
        device: &ash::Device,
        queue: vk::Queue,
        cmds: OneTimeCommands,
    ) -> Result<()> {
        let entry = self.submit_inner(device, queue, cmds)?;

        loop {
            match device.wait_for_fences(&[entry.fence], true, u64::MAX) {
                Ok(()) => break,
                Err(vk::Result::TIMEOUT) => continue,
                Err(e) => {
                    // True status unknown; keep it out of the fast path
                    // until its fence is polled again.
                    place_after_wait(&mut self.flying, entry, WaitOutcome::Failed);
                    return Err(e.into());
                }
            }
        }

        place_after_wait(&mut self.flying, entry, WaitOutcome::Signaled);
        Ok(())
    }

    /// End recording, submit, and wait at most `timeout`.
    ///
    /// Returns `Ok(true)` (pair parked at the front, known free) if the
    /// fence signaled by the deadline, `Ok(false)` (pair re-queued at the
    /// back, still flying) on timeout.
    ///
    /// # Safety
    /// The device and queue must be valid.
    pub unsafe fn submit_and_wait_timeout(
        &mut self,
        device: &ash::Device,
        queue: vk::Queue,
        cmds: OneTimeCommands,
        timeout: Duration,
    ) -> Result<bool> {
        let entry = self.submit_inner(device, queue, cmds)?;

        let timeout_ns = checked::cast::<u64, u128>(timeout.as_nanos())
            .ok_or(GpuError::TooLarge("timeout nanoseconds"))?;

        match device.wait_for_fences(&[entry.fence], true, timeout_ns) {
            Ok(()) => {
                place_after_wait(&mut self.flying, entry, WaitOutcome::Signaled);
                Ok(true)
            }
            Err(vk::Result::TIMEOUT) => {
                place_after_wait(&mut self.flying, entry, WaitOutcome::TimedOut);
                Ok(false)
            }
            Err(e) => {
                place_after_wait(&mut self.flying, entry, WaitOutcome::Failed);
                Err(e.into())
            }
        }
    }

    /// End recording and hand the work to the queue.
    unsafe fn submit_inner(
        &mut self,
        device: &ash::Device,
        queue: vk::Queue,
        cmds: OneTimeCommands,
    ) -> Result<InFlight> {
        let entry = InFlight {
            cmd: cmds.cmd,
            fence: cmds.fence,
        };

        if let Err(e) = end_command_buffer(device, entry.cmd) {
            // The pair is unusable until the context tears it down.
            self.flying.push_back(entry);
            return Err(e);
        }

        let buffers = [entry.cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&buffers);
        if let Err(e) = device.queue_submit(queue, &[submit_info], entry.fence) {
            self.flying.push_back(entry);
            return Err(e.into());
        }

        Ok(entry)
    }

    /// Free all buffers and fences and destroy the pool.
    ///
    /// # Safety
    /// The device must be valid and no flying buffer may still be
    /// executing (wait for device idle first).
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for entry in self.flying.drain(..) {
            device.destroy_fence(entry.fence, None);
        }
        // Destroying the pool frees its command buffers.
        self.pool.destroy(device);
    }
}

/// Remove and return the first entry whose fence polls signaled.
///
/// Removal swaps the hit with the back and pops, so the scan stays O(n)
/// with O(1) removal.
fn take_signaled<E>(
    flying: &mut VecDeque<InFlight>,
    mut poll: impl FnMut(vk::Fence) -> std::result::Result<bool, E>,
) -> std::result::Result<Option<InFlight>, E> {
    for i in 0..flying.len() {
        if poll(flying[i].fence)? {
            return Ok(flying.swap_remove_back(i));
        }
    }
    Ok(None)
}

/// Park a waited-on pair according to how the wait ended.
fn place_after_wait(flying: &mut VecDeque<InFlight>, entry: InFlight, outcome: WaitOutcome) {
    match outcome {
        // Known free: the next acquire should find it first.
        WaitOutcome::Signaled => flying.push_front(entry),
        // Still flying, or status unknown: keep it behind everything else.
        WaitOutcome::TimedOut | WaitOutcome::Failed => flying.push_back(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn entry(id: u64) -> InFlight {
        InFlight {
            cmd: vk::CommandBuffer::from_raw(id),
            fence: vk::Fence::from_raw(id),
        }
    }

    fn ids(flying: &VecDeque<InFlight>) -> Vec<u64> {
        flying.iter().map(|e| e.fence.as_raw()).collect()
    }

    #[test]
    fn take_signaled_returns_exact_pair_and_removes_it() {
        let mut flying = VecDeque::from([entry(1), entry(2), entry(3)]);

        // Only fence 2 has signaled
        let taken = take_signaled(&mut flying, |f| Ok::<_, ()>(f.as_raw() == 2))
            .unwrap()
            .unwrap();

        assert_eq!(taken.fence.as_raw(), 2);
        assert_eq!(taken.cmd.as_raw(), 2);
        assert_eq!(flying.len(), 2);
        assert!(flying.iter().all(|e| e.fence.as_raw() != 2));
    }

    #[test]
    fn take_signaled_skips_pending_without_blocking() {
        let mut flying = VecDeque::from([entry(1), entry(2)]);
        let mut polled = Vec::new();

        let taken = take_signaled(&mut flying, |f| {
            polled.push(f.as_raw());
            Ok::<_, ()>(false)
        })
        .unwrap();

        assert!(taken.is_none());
        assert_eq!(polled, vec![1, 2]);
        assert_eq!(flying.len(), 2);
    }

    #[test]
    fn take_signaled_propagates_poll_failure() {
        let mut flying = VecDeque::from([entry(1)]);
        let res = take_signaled(&mut flying, |_| Err::<bool, _>("device lost"));
        assert_eq!(res.unwrap_err(), "device lost");
        // Entry stays on the list for teardown
        assert_eq!(flying.len(), 1);
    }

    #[test]
    fn wait_placement_policy() {
        let mut flying = VecDeque::from([entry(1), entry(2)]);

        place_after_wait(&mut flying, entry(3), WaitOutcome::Signaled);
        assert_eq!(ids(&flying), vec![3, 1, 2]);

        place_after_wait(&mut flying, entry(4), WaitOutcome::TimedOut);
        assert_eq!(ids(&flying), vec![3, 1, 2, 4]);

        place_after_wait(&mut flying, entry(5), WaitOutcome::Failed);
        assert_eq!(ids(&flying), vec![3, 1, 2, 4, 5]);
    }

    #[test]
    fn steady_state_reuse_never_grows_the_list() {
        // One buffer in flight whose fence always signals by the time we
        // come back: the same pair must cycle forever.
        let mut flying = VecDeque::from([entry(7)]);

        for _ in 0..1000 {
            let taken = take_signaled(&mut flying, |_| Ok::<_, ()>(true))
                .unwrap()
                .expect("signaled entry must be reclaimed, not reallocated");
            assert_eq!(taken.fence.as_raw(), 7);
            flying.push_back(taken);
            assert_eq!(flying.len(), 1);
        }
    }
}
