// Graphics context - owns everything that lives as long as the swapchain
//
// FRAME FLOW (one `update` call):
// 1. Skip if the window has no area
// 2. Rebuild the swapchain if a resize or a stale present asked for it
// 3. Acquire (one retry after rebuilding on a stale swapchain)
// 4. Record the pass, submit, present
//
// Views, framebuffers and frame slots are rebuilt together, so their counts
// always equal the swapchain image count.

use ash::vk;
use std::sync::Arc;

use super::draw::{PassTarget, RenderPassExecutor};
use super::gpu::Gpu;
use super::pipeline::{create_framebuffers, create_render_pass, GraphicsPipeline};
use super::resource::{Framebuffer, RenderPass};
use super::shader::ShaderSet;
use super::swapchain::{Swapchain, SwapchainDimensions};
use super::sync::{AcquireOutcome, FrameState, FrameSynchronizer, FrameTimeouts, PresentOutcome};
use crate::error::{GfxError, GfxResult};

/// Result of one `update` tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented { image_index: u32 },
    /// No frame this tick (minimised window or a swapchain that stayed stale).
    Skipped,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameSettings {
    pub clear_color: [f32; 4],
    pub timeouts: FrameTimeouts,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.2, 1.0],
            timeouts: FrameTimeouts::default(),
        }
    }
}

pub struct GraphicsContext<G: Gpu> {
    // Drop order matters: framebuffers and slots before the pipeline and
    // render pass, all of them before the swapchain
    framebuffers: Vec<Framebuffer<G>>,
    sync: FrameSynchronizer<G>,
    pipeline: GraphicsPipeline<G>,
    render_pass: RenderPass<G>,
    swapchain: Swapchain<G>,

    shaders: ShaderSet,
    executor: RenderPassExecutor,
    requested: vk::Extent2D,
    needs_recreate: bool,
    generation: u64,
    gpu: Arc<G>,
}

impl<G: Gpu> GraphicsContext<G> {
    pub fn new(
        gpu: Arc<G>,
        surface: vk::SurfaceKHR,
        extent: vk::Extent2D,
        shaders: ShaderSet,
        settings: FrameSettings,
    ) -> GfxResult<Self> {
        let swapchain = Swapchain::new(gpu.clone(), surface, extent)?;
        let dimensions = swapchain.dimensions();

        let render_pass = create_render_pass(&gpu, dimensions.format)?;
        let pipeline = GraphicsPipeline::new(&gpu, render_pass.handle(), &shaders)?;
        let framebuffers =
            create_framebuffers(&gpu, &swapchain.image_views(), render_pass.handle(), dimensions.extent())?;

        let mut sync = FrameSynchronizer::new(gpu.clone(), settings.timeouts);
        sync.allocate_frames(swapchain.image_count())?;

        log::info!("Graphics context ready ({} frame slots)", sync.frame_count());

        Ok(Self {
            framebuffers,
            sync,
            pipeline,
            render_pass,
            swapchain,
            shaders,
            executor: RenderPassExecutor::new(settings.clear_color),
            requested: extent,
            needs_recreate: false,
            generation: 0,
            gpu,
        })
    }

    /// Run one tick: acquire, record, submit, present.
    pub fn update(&mut self) -> GfxResult<FrameOutcome> {
        if self.requested.width == 0 || self.requested.height == 0 {
            return Ok(FrameOutcome::Skipped);
        }
        if self.needs_recreate {
            self.recreate()?;
        }

        let Some(image_index) = self.acquire_with_retry()? else {
            return Ok(FrameOutcome::Skipped);
        };

        if let Err(err) = self.render(image_index) {
            // An image dropped before submission stays held by the swapchain
            if self.sync.abandon()? {
                self.needs_recreate = true;
            }
            return Err(err);
        }
        Ok(FrameOutcome::Presented { image_index })
    }

    /// Remember the new window size; the swapchain is rebuilt on the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Resize requested: {}x{}", width, height);
        self.requested = vk::Extent2D { width, height };
        self.needs_recreate = true;
    }

    fn acquire_with_retry(&mut self) -> GfxResult<Option<u32>> {
        for attempt in 0..2 {
            let outcome = match self.sync.acquire(&self.swapchain) {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Slot preparation may fail after the image was handed out
                    self.needs_recreate = true;
                    return Err(err);
                }
            };
            match outcome {
                AcquireOutcome::Ready(index) => return Ok(Some(index)),
                AcquireOutcome::Stale if attempt == 0 => {
                    log::debug!("Swapchain stale on acquire, recreating");
                    self.recreate()?;
                }
                AcquireOutcome::Stale => {
                    log::warn!("Swapchain still stale after recreation, dropping frame");
                    self.gpu.queue_wait_idle().map_err(GfxError::Submission)?;
                    self.needs_recreate = true;
                    return Ok(None);
                }
                AcquireOutcome::Failed(vk::Result::TIMEOUT | vk::Result::NOT_READY) => {
                    log::warn!("No swapchain image within the acquire timeout, dropping frame");
                    self.gpu.queue_wait_idle().map_err(GfxError::Submission)?;
                    return Ok(None);
                }
                AcquireOutcome::Failed(err) => {
                    self.gpu.queue_wait_idle().map_err(GfxError::Submission)?;
                    return Err(GfxError::Acquire(err));
                }
            }
        }
        Ok(None)
    }

    fn render(&mut self, image_index: u32) -> GfxResult<()> {
        let (_, command_buffer) = self.sync.current().ok_or(GfxError::OutOfOrder {
            expected: FrameState::Acquiring,
            found: self.sync.state(),
        })?;
        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .map(|fb| fb.handle())
            .ok_or(GfxError::FrameResource(vk::Result::ERROR_OUT_OF_DATE_KHR))?;

        let target = PassTarget {
            command_buffer,
            render_pass: self.render_pass.handle(),
            framebuffer,
            pipeline: self.pipeline.handle(),
            extent: self.swapchain.dimensions().extent(),
        };
        self.executor.record(&*self.gpu, &target)?;
        self.sync.mark_recorded()?;
        self.sync.submit()?;

        if self.sync.present(&self.swapchain)? == PresentOutcome::Stale {
            log::debug!("Present reported a stale swapchain");
            self.needs_recreate = true;
        }
        self.sync.finish()
    }

    fn recreate(&mut self) -> GfxResult<()> {
        // Stays set until every dependent is rebuilt, so a failure is retried
        self.needs_recreate = true;
        self.gpu.device_wait_idle().map_err(GfxError::Submission)?;

        self.framebuffers.clear();
        self.sync.release_frames();

        let old_format = self.swapchain.dimensions().format;
        self.swapchain.recreate(self.requested)?;
        let dimensions = self.swapchain.dimensions();

        if dimensions.format != old_format {
            log::info!("Surface format changed {:?} -> {:?}", old_format, dimensions.format);
            let render_pass = create_render_pass(&self.gpu, dimensions.format)?;
            let pipeline = GraphicsPipeline::new(&self.gpu, render_pass.handle(), &self.shaders)?;
            self.pipeline = pipeline;
            self.render_pass = render_pass;
        }

        self.framebuffers = create_framebuffers(
            &self.gpu,
            &self.swapchain.image_views(),
            self.render_pass.handle(),
            dimensions.extent(),
        )?;
        self.sync.allocate_frames(self.swapchain.image_count())?;

        self.needs_recreate = false;
        self.generation += 1;
        log::info!("Swapchain generation {}", self.generation);
        Ok(())
    }

    pub fn frame_state(&self) -> FrameState {
        self.sync.state()
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn frame_slot_count(&self) -> usize {
        self.sync.frame_count()
    }

    /// Number of swapchain recreations so far.
    pub fn swapchain_generation(&self) -> u64 {
        self.generation
    }

    pub fn recycled_semaphores(&self) -> usize {
        self.sync.recycled_semaphores()
    }

    pub fn dimensions(&self) -> SwapchainDimensions {
        self.swapchain.dimensions()
    }

    pub fn needs_recreate(&self) -> bool {
        self.needs_recreate
    }
}

impl<G: Gpu> Drop for GraphicsContext<G> {
    fn drop(&mut self) {
        // Nothing below may be destroyed while the GPU still references it
        if let Err(err) = self.gpu.queue_wait_idle() {
            log::error!("Queue wait before teardown failed: {}", err);
        }
    }
}
