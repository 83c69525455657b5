// Vulkan Device - Core GPU interface
//
// Responsibilities:
// - Instance creation with optional validation layers
// - Window surface creation through ash-window
// - Logical device + single queue creation on the selected family
// - Forwarding the `Gpu` trait to ash

use ash::extensions::{ext::DebugUtils, khr};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use super::capability::CapabilityRegistry;
use super::gpu::{Gpu, Submission};
use super::selector::{AdapterQuery, AdapterSelection};
use crate::error::{GfxError, GfxResult};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Loader, instance and the instance-level extension loaders.
pub struct VulkanInstance {
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    surface_loader: khr::Surface,
    instance: ash::Instance,
    entry: Entry,
}

impl VulkanInstance {
    /// Create the instance with the extensions the window system needs on
    /// top of whatever `registry` already asks for.
    pub fn new(
        app_name: &str,
        display: RawDisplayHandle,
        enable_validation: bool,
        registry: &mut CapabilityRegistry,
    ) -> GfxResult<Arc<Self>> {
        log::info!("Creating Vulkan instance: {}", app_name);

        // Safety: the loaded library outlives every handle through `entry`
        let entry = unsafe { Entry::load() }?;

        let window_extensions =
            ash_window::enumerate_required_extensions(display).map_err(GfxError::InstanceCreation)?;
        for &name in window_extensions {
            // Safety: ash-window hands out static NUL-terminated names
            registry.add_instance_extension(unsafe { CStr::from_ptr(name) }, true);
        }
        registry.add_instance_extension(khr::Surface::name(), true);

        let validation = enable_validation && validation_layer_available(&entry);
        if enable_validation && !validation {
            log::warn!("Validation requested but {:?} is not installed", VALIDATION_LAYER);
        }
        if validation {
            registry.add_instance_extension(DebugUtils::name(), false);
        }

        let available = entry
            .enumerate_instance_extension_properties(None)
            .map_err(GfxError::InstanceCreation)?;
        let extensions = registry.resolve_instance(&available)?;
        let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

        let app_name = CString::new(app_name).unwrap_or_default();
        let engine_name = c"gfx-core";
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let layer_names = if validation { vec![VALIDATION_LAYER.as_ptr()] } else { vec![] };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_names);

        let instance =
            unsafe { entry.create_instance(&create_info, None) }.map_err(GfxError::InstanceCreation)?;

        let debug_utils = if validation && extensions.iter().any(|e| e.as_c_str() == DebugUtils::name()) {
            match setup_debug_messenger(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(err) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(GfxError::InstanceCreation(err));
                }
            }
        } else {
            None
        };

        let surface_loader = khr::Surface::new(&entry, &instance);

        Ok(Arc::new(Self { debug_utils, surface_loader, instance, entry }))
    }

    pub fn adapter_name(&self, adapter: vk::PhysicalDevice) -> String {
        let properties = unsafe { self.instance.get_physical_device_properties(adapter) };
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl AdapterQuery for VulkanInstance {
    fn adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe { self.instance.get_physical_device_queue_family_properties(adapter) }
    }

    fn supports_present(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(adapter, family, surface)
        }
    }

    fn device_type(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceType {
        unsafe { self.instance.get_physical_device_properties(adapter) }.device_type
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn validation_layer_available(entry: &Entry) -> bool {
    entry
        .enumerate_instance_layer_properties()
        .map(|layers| {
            layers
                .iter()
                .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER)
        })
        .unwrap_or(false)
}

fn setup_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> VkResult<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
    let debug_utils = DebugUtils::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }?;
    Ok((debug_utils, messenger))
}

// Routes validation output into the log
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}

/// Presentation surface for one window. Destroyed before the instance.
pub struct WindowSurface {
    surface: vk::SurfaceKHR,
    instance: Arc<VulkanInstance>,
}

impl WindowSurface {
    pub fn new(
        instance: Arc<VulkanInstance>,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> GfxResult<Self> {
        let surface = unsafe {
            ash_window::create_surface(&instance.entry, &instance.instance, display, window, None)
        }
        .map_err(GfxError::SurfaceCreation)?;

        Ok(Self { surface, instance })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        unsafe { self.instance.surface_loader.destroy_surface(self.surface, None) };
    }
}

/// Logical device with its single graphics+present queue.
pub struct VulkanDevice {
    swapchain_loader: khr::Swapchain,
    device: ash::Device,
    queue: vk::Queue,
    queue_family: u32,
    physical_device: vk::PhysicalDevice,
    instance: Arc<VulkanInstance>,
}

impl VulkanDevice {
    pub fn new(
        instance: Arc<VulkanInstance>,
        selection: AdapterSelection,
        registry: &CapabilityRegistry,
    ) -> GfxResult<Arc<Self>> {
        let physical_device = selection.adapter;
        log::info!(
            "Selected GPU #{}: {} (queue family {})",
            selection.ordinal,
            instance.adapter_name(physical_device),
            selection.queue_family
        );

        let available = unsafe { instance.instance.enumerate_device_extension_properties(physical_device) }
            .map_err(GfxError::DeviceCreation)?;
        let extensions = registry.resolve_device(&available)?;
        let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

        let queue_priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(selection.queue_family)
            .queue_priorities(&queue_priorities)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extension_ptrs);

        let device = unsafe { instance.instance.create_device(physical_device, &create_info, None) }
            .map_err(GfxError::DeviceCreation)?;
        let queue = unsafe { device.get_device_queue(selection.queue_family, 0) };
        let swapchain_loader = khr::Swapchain::new(&instance.instance, &device);

        Ok(Arc::new(Self {
            swapchain_loader,
            device,
            queue,
            queue_family: selection.queue_family,
            physical_device,
            instance,
        }))
    }
}

impl Gpu for VulkanDevice {
    fn queue_family_index(&self) -> u32 {
        self.queue_family
    }

    fn surface_capabilities(&self, surface: vk::SurfaceKHR) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.instance
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, surface)
        }
    }

    fn surface_formats(&self, surface: vk::SurfaceKHR) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.instance
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, surface)
        }
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR) -> VkResult<vk::SwapchainKHR> {
        unsafe { self.swapchain_loader.create_swapchain(info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout, semaphore, vk::Fence::null())
        }
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> VkResult<bool> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(self.queue, &present_info) }
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        unsafe { self.device.create_image_view(info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo) -> VkResult<vk::Framebuffer> {
        unsafe { self.device.create_framebuffer(info, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        unsafe { self.device.create_render_pass(info, None) }
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
        unsafe { self.device.create_shader_module(&create_info, None) }
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) }
    }

    fn create_pipeline_layout(&self, info: &vk::PipelineLayoutCreateInfo) -> VkResult<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(info, None) }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) }
    }

    fn create_graphics_pipeline(&self, info: &vk::GraphicsPipelineCreateInfo) -> VkResult<vk::Pipeline> {
        let pipelines = unsafe {
            self.device
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(info), None)
        }
        .map_err(|(_, err)| err)?;
        pipelines.into_iter().next().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence_info = vk::FenceCreateInfo::builder().flags(flags);
        unsafe { self.device.create_fence(&fence_info, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, timeout) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.reset_fences(&[fence]) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        unsafe { self.device.create_semaphore(&semaphore_info, None) }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn create_command_pool(&self) -> VkResult<vk::CommandPool> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(self.queue_family);
        unsafe { self.device.create_command_pool(&pool_info, None) }
    }

    fn reset_command_pool(&self, pool: vk::CommandPool) -> VkResult<()> {
        unsafe { self.device.reset_command_pool(pool, vk::CommandPoolResetFlags::empty()) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffer(&self, pool: vk::CommandPool) -> VkResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }?;
        buffers.into_iter().next().ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(cmd, &begin_info) }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo) {
        unsafe { self.device.cmd_begin_render_pass(cmd, info, vk::SubpassContents::INLINE) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_set_viewport(&self, cmd: vk::CommandBuffer, viewport: vk::Viewport) {
        unsafe { self.device.cmd_set_viewport(cmd, 0, &[viewport]) }
    }

    fn cmd_set_scissor(&self, cmd: vk::CommandBuffer, scissor: vk::Rect2D) {
        unsafe { self.device.cmd_set_scissor(cmd, 0, &[scissor]) }
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        unsafe { self.device.cmd_draw(cmd, vertex_count, instance_count, 0, 0) }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn queue_submit(&self, submission: &Submission) -> VkResult<()> {
        let wait_semaphores = [submission.wait_semaphore];
        let wait_stages = [submission.wait_stage];
        let command_buffers = [submission.command_buffer];
        let signal_semaphores = [submission.signal_semaphore];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe { self.device.queue_submit(self.queue, &[submit_info], submission.fence) }
    }

    fn queue_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.queue_wait_idle(self.queue) }
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");
        if let Err(err) = self.device_wait_idle() {
            log::error!("Device wait before teardown failed: {}", err);
        }
        unsafe { self.device.destroy_device(None) };
    }
}
