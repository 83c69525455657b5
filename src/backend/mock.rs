// Test double for the device and adapter layers.
//
// Fabricates handles, keeps a per-kind live set and an event log, and models
// just enough of the fence / semaphore / command buffer state machine to
// record protocol violations instead of crashing a driver.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::gpu::{Gpu, Submission};
use super::selector::AdapterQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Swapchain,
    ImageView,
    Framebuffer,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Fence,
    Semaphore,
    CommandPool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SwapchainCreated {
        handle: vk::SwapchainKHR,
        old: vk::SwapchainKHR,
        min_image_count: u32,
        extent: vk::Extent2D,
        format: vk::Format,
        pre_transform: vk::SurfaceTransformFlagsKHR,
        composite_alpha: vk::CompositeAlphaFlagsKHR,
        present_mode: vk::PresentModeKHR,
    },
    RenderPassCreated { format: vk::Format },
    Destroyed(Kind, u64),
    Acquire { semaphore: vk::Semaphore, result: VkResult<(u32, bool)> },
    FenceWaited(vk::Fence),
    FenceReset(vk::Fence),
    PoolReset(vk::CommandPool),
    Viewport { width: f32, height: f32 },
    Draw { vertex_count: u32, instance_count: u32 },
    Submitted(Submission),
    Presented { image_index: u32, wait: vk::Semaphore },
    QueueWaitIdle,
    DeviceWaitIdle,
}

/// Scripted outcome for the next acquire call.
#[derive(Debug, Clone, Copy)]
pub enum Acquire {
    Suboptimal,
    Fail(vk::Result),
}

#[derive(Debug, Default)]
struct FenceState {
    signaled: bool,
    pending: bool,
    observed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SemaphoreState {
    Unsignaled,
    Signaled,
    Waiting(vk::Fence),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    Initial,
    Recording,
    Executable,
    Submitted,
}

struct SwapchainState {
    images: Vec<vk::Image>,
    next_image: u32,
    retired: bool,
}

struct State {
    next_handle: u64,
    live: HashMap<u64, Kind>,
    fences: HashMap<u64, FenceState>,
    semaphores: HashMap<u64, SemaphoreState>,
    pools: HashMap<u64, Option<vk::Fence>>,
    cmds: HashMap<u64, (vk::CommandPool, CmdState)>,
    swapchains: HashMap<u64, SwapchainState>,
    capabilities: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    image_count: Option<u32>,
    acquire_script: VecDeque<Acquire>,
    present_script: VecDeque<VkResult<bool>>,
    failures: HashMap<&'static str, vk::Result>,
    events: Vec<Event>,
    violations: Vec<String>,
}

impl State {
    fn alloc(&mut self, kind: Kind) -> u64 {
        self.next_handle += 1;
        let raw = self.next_handle;
        self.live.insert(raw, kind);
        raw
    }

    fn injected(&mut self, op: &'static str) -> VkResult<()> {
        match self.failures.remove(op) {
            Some(result) => Err(result),
            None => Ok(()),
        }
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }

    fn require_live(&mut self, kind: Kind, raw: u64, context: &str) {
        if self.live.get(&raw) != Some(&kind) {
            self.violation(format!("{context}: {kind:?} {raw:#x} is not live"));
        }
    }

    fn destroy(&mut self, kind: Kind, raw: u64) {
        if raw == 0 {
            return;
        }
        if self.live.remove(&raw) != Some(kind) {
            self.violation(format!("{kind:?} {raw:#x} destroyed twice or never created"));
        }
        self.events.push(Event::Destroyed(kind, raw));
    }

    fn retire(&mut self, fence: vk::Fence) {
        if let Some(state) = self.fences.get_mut(&fence.as_raw()) {
            if state.pending {
                state.pending = false;
                state.signaled = true;
            }
            state.observed = state.signaled;
        }
        for state in self.semaphores.values_mut() {
            if *state == SemaphoreState::Waiting(fence) {
                *state = SemaphoreState::Unsignaled;
            }
        }
        for pending in self.pools.values_mut() {
            if *pending == Some(fence) {
                *pending = None;
            }
        }
    }

    fn retire_all(&mut self) {
        let fences: Vec<u64> = self.fences.keys().copied().collect();
        for raw in fences {
            self.retire(vk::Fence::from_raw(raw));
        }
    }

    fn recording(&mut self, cmd: vk::CommandBuffer, op: &str) {
        let state = self.cmds.get(&cmd.as_raw()).map(|(_, s)| *s);
        if state != Some(CmdState::Recording) {
            self.violation(format!("{op} on command buffer in state {state:?}"));
        }
    }
}

pub struct MockGpu {
    state: Mutex<State>,
}

impl MockGpu {
    pub fn new() -> Self {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D { width: 800, height: 600 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            max_image_array_layers: 1,
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY
                | vk::SurfaceTransformFlagsKHR::ROTATE_90,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE
                | vk::CompositeAlphaFlagsKHR::INHERIT,
            supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        };

        Self {
            state: Mutex::new(State {
                next_handle: 0x1000,
                live: HashMap::new(),
                fences: HashMap::new(),
                semaphores: HashMap::new(),
                pools: HashMap::new(),
                cmds: HashMap::new(),
                swapchains: HashMap::new(),
                capabilities,
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                image_count: None,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                failures: HashMap::new(),
                events: Vec::new(),
                violations: Vec::new(),
            }),
        }
    }

    pub fn set_capabilities(&self, capabilities: vk::SurfaceCapabilitiesKHR) {
        self.state.lock().capabilities = capabilities;
    }

    pub fn capabilities(&self) -> vk::SurfaceCapabilitiesKHR {
        self.state.lock().capabilities
    }

    pub fn set_formats(&self, formats: Vec<vk::SurfaceFormatKHR>) {
        self.state.lock().formats = formats;
    }

    /// Force the number of images the platform hands back, regardless of
    /// the requested minimum.
    pub fn set_image_count(&self, count: u32) {
        self.state.lock().image_count = Some(count);
    }

    pub fn script_acquire(&self, outcome: Acquire) {
        self.state.lock().acquire_script.push_back(outcome);
    }

    pub fn script_present(&self, result: VkResult<bool>) {
        self.state.lock().present_script.push_back(result);
    }

    /// Make the next call to `op` fail with `result`.
    pub fn fail_next(&self, op: &'static str, result: vk::Result) {
        self.state.lock().failures.insert(op, result);
    }

    pub fn live(&self, kind: Kind) -> usize {
        self.state.lock().live.values().filter(|&&k| k == kind).count()
    }

    pub fn total_live(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }
}

impl Gpu for MockGpu {
    fn queue_family_index(&self) -> u32 {
        0
    }

    fn surface_capabilities(&self, _surface: vk::SurfaceKHR) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let mut state = self.state.lock();
        state.injected("surface_capabilities")?;
        Ok(state.capabilities)
    }

    fn surface_formats(&self, _surface: vk::SurfaceKHR) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.state.lock().formats.clone())
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR) -> VkResult<vk::SwapchainKHR> {
        let mut state = self.state.lock();
        state.injected("create_swapchain")?;

        let old = info.old_swapchain;
        if old != vk::SwapchainKHR::null() {
            state.require_live(Kind::Swapchain, old.as_raw(), "old swapchain");
            if let Some(previous) = state.swapchains.get_mut(&old.as_raw()) {
                previous.retired = true;
            }
        }

        let raw = state.alloc(Kind::Swapchain);
        let count = state.image_count.unwrap_or(info.min_image_count);
        let images: Vec<vk::Image> = (0..count)
            .map(|_| {
                state.next_handle += 1;
                vk::Image::from_raw(state.next_handle)
            })
            .collect();
        state.swapchains.insert(raw, SwapchainState { images, next_image: 0, retired: false });

        let handle = vk::SwapchainKHR::from_raw(raw);
        state.events.push(Event::SwapchainCreated {
            handle,
            old,
            min_image_count: info.min_image_count,
            extent: info.image_extent,
            format: info.image_format,
            pre_transform: info.pre_transform,
            composite_alpha: info.composite_alpha,
            present_mode: info.present_mode,
        });
        Ok(handle)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let state = self.state.lock();
        state
            .swapchains
            .get(&swapchain.as_raw())
            .map(|s| s.images.clone())
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut state = self.state.lock();
        state.swapchains.remove(&swapchain.as_raw());
        state.destroy(Kind::Swapchain, swapchain.as_raw());
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut state = self.state.lock();
        state.require_live(Kind::Swapchain, swapchain.as_raw(), "acquire");
        state.require_live(Kind::Semaphore, semaphore.as_raw(), "acquire");

        let sem_state = state.semaphores.get(&semaphore.as_raw()).copied();
        if sem_state != Some(SemaphoreState::Unsignaled) {
            state.violation(format!(
                "acquire reused semaphore {:#x} in state {sem_state:?}",
                semaphore.as_raw()
            ));
        }

        let scripted = state.acquire_script.pop_front();
        let result = match scripted {
            Some(Acquire::Fail(err)) => Err(err),
            _ => {
                let retired = state.swapchains.get(&swapchain.as_raw()).map(|s| s.retired);
                if retired == Some(true) {
                    state.violation("acquire from a retired swapchain".to_string());
                }
                let next = state.swapchains.get_mut(&swapchain.as_raw()).map(|chain| {
                    let index = chain.next_image % chain.images.len() as u32;
                    chain.next_image += 1;
                    index
                });
                match next {
                    Some(index) => {
                        state.semaphores.insert(semaphore.as_raw(), SemaphoreState::Signaled);
                        Ok((index, matches!(scripted, Some(Acquire::Suboptimal))))
                    }
                    None => Err(vk::Result::ERROR_SURFACE_LOST_KHR),
                }
            }
        };

        state.events.push(Event::Acquire { semaphore, result });
        result
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> VkResult<bool> {
        let mut state = self.state.lock();
        state.require_live(Kind::Swapchain, swapchain.as_raw(), "present");
        if state.semaphores.get(&wait_semaphore.as_raw()) != Some(&SemaphoreState::Signaled) {
            state.violation("present waits on a semaphore nothing signals".to_string());
        }
        state.semaphores.insert(wait_semaphore.as_raw(), SemaphoreState::Unsignaled);
        state.events.push(Event::Presented { image_index, wait: wait_semaphore });
        state.present_script.pop_front().unwrap_or(Ok(false))
    }

    fn create_image_view(&self, _info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        let mut state = self.state.lock();
        state.injected("create_image_view")?;
        Ok(vk::ImageView::from_raw(state.alloc(Kind::ImageView)))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.state.lock().destroy(Kind::ImageView, view.as_raw());
    }

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo) -> VkResult<vk::Framebuffer> {
        let mut state = self.state.lock();
        state.require_live(Kind::RenderPass, info.render_pass.as_raw(), "framebuffer");
        let attachments = if info.attachment_count == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(info.p_attachments, info.attachment_count as usize) }
        };
        for view in attachments {
            state.require_live(Kind::ImageView, view.as_raw(), "framebuffer attachment");
        }
        Ok(vk::Framebuffer::from_raw(state.alloc(Kind::Framebuffer)))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.state.lock().destroy(Kind::Framebuffer, framebuffer.as_raw());
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        let mut state = self.state.lock();
        state.injected("create_render_pass")?;
        if info.attachment_count > 0 {
            let format = unsafe { (*info.p_attachments).format };
            state.events.push(Event::RenderPassCreated { format });
        }
        Ok(vk::RenderPass::from_raw(state.alloc(Kind::RenderPass)))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.state.lock().destroy(Kind::RenderPass, render_pass.as_raw());
    }

    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let mut state = self.state.lock();
        if code.is_empty() {
            return Err(vk::Result::ERROR_INVALID_SHADER_NV);
        }
        Ok(vk::ShaderModule::from_raw(state.alloc(Kind::ShaderModule)))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.state.lock().destroy(Kind::ShaderModule, module.as_raw());
    }

    fn create_pipeline_layout(&self, _info: &vk::PipelineLayoutCreateInfo) -> VkResult<vk::PipelineLayout> {
        let mut state = self.state.lock();
        Ok(vk::PipelineLayout::from_raw(state.alloc(Kind::PipelineLayout)))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.state.lock().destroy(Kind::PipelineLayout, layout.as_raw());
    }

    fn create_graphics_pipeline(&self, info: &vk::GraphicsPipelineCreateInfo) -> VkResult<vk::Pipeline> {
        let mut state = self.state.lock();
        state.injected("create_graphics_pipeline")?;
        state.require_live(Kind::RenderPass, info.render_pass.as_raw(), "pipeline");
        state.require_live(Kind::PipelineLayout, info.layout.as_raw(), "pipeline");
        let stages = unsafe { std::slice::from_raw_parts(info.p_stages, info.stage_count as usize) };
        for stage in stages {
            state.require_live(Kind::ShaderModule, stage.module.as_raw(), "pipeline stage");
        }
        Ok(vk::Pipeline::from_raw(state.alloc(Kind::Pipeline)))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.state.lock().destroy(Kind::Pipeline, pipeline.as_raw());
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let mut state = self.state.lock();
        let raw = state.alloc(Kind::Fence);
        state.fences.insert(raw, FenceState { signaled, ..Default::default() });
        Ok(vk::Fence::from_raw(raw))
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout: u64) -> VkResult<()> {
        let mut state = self.state.lock();
        state.require_live(Kind::Fence, fence.as_raw(), "wait");
        state.retire(fence);
        state.events.push(Event::FenceWaited(fence));
        match state.fences.get(&fence.as_raw()) {
            Some(f) if f.signaled => Ok(()),
            // Nothing will ever signal it: a real device would hang here.
            _ => Err(vk::Result::TIMEOUT),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut state = self.state.lock();
        let observed = state.fences.get(&fence.as_raw()).map(|f| f.observed);
        if observed != Some(true) {
            state.violation(format!("fence {:#x} reset before it was observed signaled", fence.as_raw()));
        }
        if let Some(f) = state.fences.get_mut(&fence.as_raw()) {
            f.signaled = false;
            f.observed = false;
        }
        state.events.push(Event::FenceReset(fence));
        Ok(())
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut state = self.state.lock();
        if state.fences.remove(&fence.as_raw()).map_or(false, |f| f.pending) {
            state.violation(format!("fence {:#x} destroyed while in flight", fence.as_raw()));
        }
        state.destroy(Kind::Fence, fence.as_raw());
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let mut state = self.state.lock();
        let raw = state.alloc(Kind::Semaphore);
        state.semaphores.insert(raw, SemaphoreState::Unsignaled);
        Ok(vk::Semaphore::from_raw(raw))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut state = self.state.lock();
        if let Some(SemaphoreState::Waiting(_)) = state.semaphores.remove(&semaphore.as_raw()) {
            state.violation(format!("semaphore {:#x} destroyed while in use", semaphore.as_raw()));
        }
        state.destroy(Kind::Semaphore, semaphore.as_raw());
    }

    fn create_command_pool(&self) -> VkResult<vk::CommandPool> {
        let mut state = self.state.lock();
        let raw = state.alloc(Kind::CommandPool);
        state.pools.insert(raw, None);
        Ok(vk::CommandPool::from_raw(raw))
    }

    fn reset_command_pool(&self, pool: vk::CommandPool) -> VkResult<()> {
        let mut state = self.state.lock();
        if let Some(Some(fence)) = state.pools.get(&pool.as_raw()).copied() {
            state.violation(format!(
                "command pool {:#x} reset while fence {:#x} is pending",
                pool.as_raw(),
                fence.as_raw()
            ));
        }
        for (owner, cmd_state) in state.cmds.values_mut() {
            if *owner == pool {
                *cmd_state = CmdState::Initial;
            }
        }
        state.events.push(Event::PoolReset(pool));
        Ok(())
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut state = self.state.lock();
        if let Some(Some(_)) = state.pools.remove(&pool.as_raw()) {
            state.violation(format!("command pool {:#x} destroyed while in flight", pool.as_raw()));
        }
        state.cmds.retain(|_, (owner, _)| *owner != pool);
        state.destroy(Kind::CommandPool, pool.as_raw());
    }

    fn allocate_command_buffer(&self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer> {
        let mut state = self.state.lock();
        state.require_live(Kind::CommandPool, pool.as_raw(), "allocate");
        state.next_handle += 1;
        let raw = state.next_handle;
        state.cmds.insert(raw, (pool, CmdState::Initial));
        Ok(vk::CommandBuffer::from_raw(raw))
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let mut state = self.state.lock();
        state.injected("begin_command_buffer")?;
        let found = state.cmds.get(&cmd.as_raw()).map(|(_, s)| *s);
        if found != Some(CmdState::Initial) {
            state.violation(format!("begin on command buffer in state {found:?}"));
        }
        if let Some((_, s)) = state.cmds.get_mut(&cmd.as_raw()) {
            *s = CmdState::Recording;
        }
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let mut state = self.state.lock();
        state.injected("end_command_buffer")?;
        state.recording(cmd, "end");
        if let Some((_, s)) = state.cmds.get_mut(&cmd.as_raw()) {
            *s = CmdState::Executable;
        }
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo) {
        let mut state = self.state.lock();
        state.recording(cmd, "begin render pass");
        state.require_live(Kind::Framebuffer, info.framebuffer.as_raw(), "begin render pass");
        state.require_live(Kind::RenderPass, info.render_pass.as_raw(), "begin render pass");
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        let mut state = self.state.lock();
        state.recording(cmd, "bind pipeline");
        state.require_live(Kind::Pipeline, pipeline.as_raw(), "bind pipeline");
    }

    fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        let mut state = self.state.lock();
        state.recording(cmd, "set viewport");
        state.events.push(Event::Viewport { width: viewport.width, height: viewport.height });
    }

    fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, _scissor: vk::Rect2D) {
        self.state.lock().recording(cmd, "set scissor");
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        let mut state = self.state.lock();
        state.recording(cmd, "draw");
        state.events.push(Event::Draw { vertex_count, instance_count });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.state.lock().recording(cmd, "end render pass");
    }

    fn queue_submit(&self, submission: &Submission) -> VkResult<()> {
        let mut state = self.state.lock();
        state.injected("queue_submit")?;

        let fence = submission.fence;
        let unsignaled = matches!(state.fences.get(&fence.as_raw()), Some(f) if !f.signaled && !f.pending);
        if !unsignaled {
            state.violation(format!("submit with fence {:#x} not in the unsignaled state", fence.as_raw()));
        }
        if let Some(f) = state.fences.get_mut(&fence.as_raw()) {
            f.pending = true;
        }

        let wait = submission.wait_semaphore.as_raw();
        if state.semaphores.get(&wait) != Some(&SemaphoreState::Signaled) {
            state.violation("submit waits on a semaphore nothing signals".to_string());
        }
        state.semaphores.insert(wait, SemaphoreState::Waiting(fence));

        let signal = submission.signal_semaphore.as_raw();
        if state.semaphores.get(&signal) != Some(&SemaphoreState::Unsignaled) {
            state.violation("submit signals a semaphore that is already signaled".to_string());
        }
        state.semaphores.insert(signal, SemaphoreState::Signaled);

        match state.cmds.get(&submission.command_buffer.as_raw()).copied() {
            Some((pool, CmdState::Executable)) => {
                state.cmds.insert(submission.command_buffer.as_raw(), (pool, CmdState::Submitted));
                state.pools.insert(pool.as_raw(), Some(fence));
            }
            other => state.violation(format!("submitted command buffer in state {other:?}")),
        }

        state.events.push(Event::Submitted(*submission));
        Ok(())
    }

    fn queue_wait_idle(&self) -> VkResult<()> {
        let mut state = self.state.lock();
        state.retire_all();
        state.events.push(Event::QueueWaitIdle);
        Ok(())
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        let mut state = self.state.lock();
        state.retire_all();
        state.events.push(Event::DeviceWaitIdle);
        Ok(())
    }
}

/// One fake adapter: its type and, per queue family, (flags, can present).
#[derive(Debug, Clone)]
pub struct MockAdapter {
    pub device_type: vk::PhysicalDeviceType,
    pub families: Vec<(vk::QueueFlags, bool)>,
}

impl MockAdapter {
    pub fn new(device_type: vk::PhysicalDeviceType, families: &[(vk::QueueFlags, bool)]) -> Self {
        Self { device_type, families: families.to_vec() }
    }
}

#[derive(Debug, Default)]
pub struct MockAdapters {
    pub adapters: Vec<MockAdapter>,
}

impl MockAdapters {
    pub fn new(adapters: Vec<MockAdapter>) -> Self {
        Self { adapters }
    }

    /// Adapters are numbered from 1 so no handle is null.
    pub fn handle(ordinal: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(ordinal as u64 + 1)
    }

    fn get(&self, adapter: vk::PhysicalDevice) -> &MockAdapter {
        &self.adapters[adapter.as_raw() as usize - 1]
    }
}

impl AdapterQuery for MockAdapters {
    fn adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.adapters.len()).map(Self::handle).collect())
    }

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.get(adapter)
            .families
            .iter()
            .map(|(flags, _)| vk::QueueFamilyProperties {
                queue_flags: *flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn supports_present(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        Ok(self.get(adapter).families[family as usize].1)
    }

    fn device_type(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceType {
        self.get(adapter).device_type
    }
}
