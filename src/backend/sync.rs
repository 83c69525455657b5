// Synchronization - per-image frame slots
//
// One slot per swapchain image: a fence (pre-signaled), a transient command
// pool with one primary buffer, the acquire semaphore and a lazily created
// present semaphore. A slot is reused only after its fence was observed
// signaled, which bounds frames in flight to the image count.

use ash::vk;
use std::sync::Arc;

use super::gpu::{Gpu, Submission};
use super::resource::{CommandPool, Fence, Semaphore};
use super::swapchain::Swapchain;
use crate::error::{GfxError, GfxResult};

/// Steps of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Acquiring,
    Recorded,
    Submitted,
    Presented,
}

/// Nanosecond bounds for the two blocking waits. `u64::MAX` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimeouts {
    pub acquire_ns: u64,
    pub fence_ns: u64,
}

impl Default for FrameTimeouts {
    fn default() -> Self {
        Self { acquire_ns: u64::MAX, fence_ns: u64::MAX }
    }
}

impl FrameTimeouts {
    pub fn from_millis(acquire_ms: Option<u64>, fence_ms: Option<u64>) -> Self {
        let ns = |ms: Option<u64>| ms.map_or(u64::MAX, |ms| ms.saturating_mul(1_000_000));
        Self { acquire_ns: ns(acquire_ms), fence_ns: ns(fence_ms) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Slot prepared; record into it.
    Ready(u32),
    /// Swapchain is suboptimal or out of date and must be rebuilt.
    Stale,
    Failed(vk::Result),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Shown, but the swapchain should be rebuilt before the next tick.
    Stale,
}

pub struct PerFrame<G: Gpu> {
    fence: Fence<G>,
    command_pool: CommandPool<G>,
    command_buffer: vk::CommandBuffer,
    acquire_semaphore: Option<Semaphore<G>>,
    present_semaphore: Option<Semaphore<G>>,
}

impl<G: Gpu> PerFrame<G> {
    fn new(gpu: &Arc<G>) -> GfxResult<Self> {
        let fence = Fence::new(gpu.clone(), gpu.create_fence(true).map_err(GfxError::FrameResource)?);
        let command_pool = CommandPool::new(gpu.clone(), gpu.create_command_pool().map_err(GfxError::FrameResource)?);
        let command_buffer = gpu
            .allocate_command_buffer(command_pool.handle())
            .map_err(GfxError::FrameResource)?;

        Ok(Self {
            fence,
            command_pool,
            command_buffer,
            acquire_semaphore: None,
            present_semaphore: None,
        })
    }
}

/// Free list of semaphores whose last wait has retired.
pub struct SemaphorePool<G: Gpu> {
    free: Vec<Semaphore<G>>,
}

impl<G: Gpu> SemaphorePool<G> {
    pub fn new() -> Self {
        Self { free: Vec::new() }
    }

    pub fn take(&mut self, gpu: &Arc<G>) -> GfxResult<Semaphore<G>> {
        match self.free.pop() {
            Some(semaphore) => Ok(semaphore),
            None => {
                let semaphore = gpu.create_semaphore().map_err(GfxError::FrameResource)?;
                Ok(Semaphore::new(gpu.clone(), semaphore))
            }
        }
    }

    pub fn give(&mut self, semaphore: Semaphore<G>) {
        self.free.push(semaphore);
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

impl<G: Gpu> Default for SemaphorePool<G> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FrameSynchronizer<G: Gpu> {
    frames: Vec<PerFrame<G>>,
    pool: SemaphorePool<G>,
    // Signaled by an acquire nobody waited on; dropped after the next idle wait
    orphaned: Vec<Semaphore<G>>,
    state: FrameState,
    current: Option<u32>,
    timeouts: FrameTimeouts,
    gpu: Arc<G>,
}

impl<G: Gpu> FrameSynchronizer<G> {
    pub fn new(gpu: Arc<G>, timeouts: FrameTimeouts) -> Self {
        Self {
            frames: Vec::new(),
            pool: SemaphorePool::new(),
            orphaned: Vec::new(),
            state: FrameState::Idle,
            current: None,
            timeouts,
            gpu,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn recycled_semaphores(&self) -> usize {
        self.pool.len()
    }

    /// Image index and command buffer of the frame being built.
    pub fn current(&self) -> Option<(u32, vk::CommandBuffer)> {
        let index = self.current?;
        let frame = self.frames.get(index as usize)?;
        Some((index, frame.command_buffer))
    }

    /// One slot per swapchain image.
    pub fn allocate_frames(&mut self, count: usize) -> GfxResult<()> {
        debug_assert!(self.frames.is_empty());
        self.frames = (0..count)
            .map(|_| PerFrame::new(&self.gpu))
            .collect::<GfxResult<_>>()?;
        log::debug!("Allocated {} frame slots", count);
        Ok(())
    }

    /// Tear down every slot. The device must be idle.
    pub fn release_frames(&mut self) {
        for mut frame in self.frames.drain(..) {
            if let Some(semaphore) = frame.acquire_semaphore.take() {
                self.pool.give(semaphore);
            }
        }
        self.orphaned.clear();
        self.state = FrameState::Idle;
        self.current = None;
    }

    /// Acquire the next image and make its slot ready for recording.
    pub fn acquire(&mut self, swapchain: &Swapchain<G>) -> GfxResult<AcquireOutcome> {
        self.expect(FrameState::Idle)?;
        self.state = FrameState::Acquiring;

        let semaphore = self.pool.take(&self.gpu)?;
        match swapchain.acquire_next_image(self.timeouts.acquire_ns, semaphore.handle()) {
            Ok((index, false)) => {
                self.prepare_slot(index, semaphore)?;
                Ok(AcquireOutcome::Ready(index))
            }
            Ok((_, true)) => {
                // The image was still acquired, so the semaphore will signal
                self.orphaned.push(semaphore);
                self.state = FrameState::Idle;
                Ok(AcquireOutcome::Stale)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.pool.give(semaphore);
                self.state = FrameState::Idle;
                Ok(AcquireOutcome::Stale)
            }
            Err(err) => {
                self.pool.give(semaphore);
                self.state = FrameState::Idle;
                Ok(AcquireOutcome::Failed(err))
            }
        }
    }

    fn prepare_slot(&mut self, index: u32, semaphore: Semaphore<G>) -> GfxResult<()> {
        let Some((fence, pool)) = self
            .frames
            .get(index as usize)
            .map(|frame| (frame.fence.handle(), frame.command_pool.handle()))
        else {
            self.orphaned.push(semaphore);
            self.state = FrameState::Idle;
            return Err(GfxError::FrameResource(vk::Result::ERROR_OUT_OF_DATE_KHR));
        };

        if let Err(err) = self.gpu.wait_for_fence(fence, self.timeouts.fence_ns) {
            self.orphaned.push(semaphore);
            self.state = FrameState::Idle;
            return Err(GfxError::FenceWait(err));
        }

        let reset = self
            .gpu
            .reset_fence(fence)
            .and_then(|()| self.gpu.reset_command_pool(pool));
        if let Err(err) = reset {
            self.orphaned.push(semaphore);
            self.state = FrameState::Idle;
            self.rearm(index as usize)?;
            return Err(GfxError::FrameResource(err));
        }

        // The previous acquire on this slot retired with the fence above
        let frame = &mut self.frames[index as usize];
        if let Some(previous) = frame.acquire_semaphore.replace(semaphore) {
            self.pool.give(previous);
        }
        self.current = Some(index);
        Ok(())
    }

    pub fn mark_recorded(&mut self) -> GfxResult<()> {
        self.expect(FrameState::Acquiring)?;
        self.state = FrameState::Recorded;
        Ok(())
    }

    pub fn submit(&mut self) -> GfxResult<()> {
        self.expect(FrameState::Recorded)?;
        let index = self.current_index()?;
        let gpu = self.gpu.clone();
        let frame = &mut self.frames[index];

        if frame.present_semaphore.is_none() {
            let semaphore = gpu.create_semaphore().map_err(GfxError::FrameResource)?;
            frame.present_semaphore = Some(Semaphore::new(gpu.clone(), semaphore));
        }

        let submission = Submission {
            command_buffer: frame.command_buffer,
            wait_semaphore: handle_of(&frame.acquire_semaphore),
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: handle_of(&frame.present_semaphore),
            fence: frame.fence.handle(),
        };
        gpu.queue_submit(&submission).map_err(GfxError::Submission)?;

        self.state = FrameState::Submitted;
        Ok(())
    }

    pub fn present(&mut self, swapchain: &Swapchain<G>) -> GfxResult<PresentOutcome> {
        self.expect(FrameState::Submitted)?;
        let index = self.current_index()?;
        let wait = handle_of(&self.frames[index].present_semaphore);

        let outcome = match swapchain.present(index as u32, wait) {
            Ok(false) => PresentOutcome::Presented,
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => PresentOutcome::Stale,
            Err(err) => return Err(GfxError::Present(err)),
        };
        self.state = FrameState::Presented;
        Ok(outcome)
    }

    pub fn finish(&mut self) -> GfxResult<()> {
        self.expect(FrameState::Presented)?;
        self.state = FrameState::Idle;
        self.current = None;
        Ok(())
    }

    /// Drop the tick in progress and return to `Idle`. A slot that was
    /// prepared but never submitted gets a fresh signaled fence.
    ///
    /// Returns true when an acquired image was dropped without being
    /// presented. The swapchain still counts it as held until it is rebuilt.
    pub fn abandon(&mut self) -> GfxResult<bool> {
        let state = std::mem::replace(&mut self.state, FrameState::Idle);
        let Some(index) = self.current.take() else {
            return Ok(false);
        };

        if !matches!(state, FrameState::Acquiring | FrameState::Recorded) {
            return Ok(false);
        }

        let index = index as usize;
        if let Some(semaphore) = self.frames[index].acquire_semaphore.take() {
            self.orphaned.push(semaphore);
        }
        self.rearm(index)?;
        log::warn!("Abandoned frame on slot {} before submission", index);
        Ok(true)
    }

    /// Acquire semaphores waiting for the next frame release.
    pub fn orphaned_semaphores(&self) -> usize {
        self.orphaned.len()
    }

    fn rearm(&mut self, index: usize) -> GfxResult<()> {
        let fence = self.gpu.create_fence(true).map_err(GfxError::FrameResource)?;
        self.frames[index].fence = Fence::new(self.gpu.clone(), fence);
        Ok(())
    }

    fn current_index(&self) -> GfxResult<usize> {
        self.current.map(|i| i as usize).ok_or(GfxError::OutOfOrder {
            expected: FrameState::Acquiring,
            found: self.state,
        })
    }

    fn expect(&self, expected: FrameState) -> GfxResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GfxError::OutOfOrder { expected, found: self.state })
        }
    }
}

fn handle_of<G: Gpu>(semaphore: &Option<Semaphore<G>>) -> vk::Semaphore {
    semaphore.as_ref().map_or(vk::Semaphore::null(), |s| s.handle())
}
