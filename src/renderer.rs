// Renderer - the real Vulkan stack behind one window
//
// Owns instance, surface, device and the graphics context. Field order is
// drop order: context first, then the device, then the surface it presents
// to. The instance goes last, held alive by the other two.

use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::sync::Arc;

use crate::backend::{
    select_adapter, CapabilityRegistry, FrameOutcome, FrameSettings, Glslc, GraphicsContext, ShaderSet,
    VulkanDevice, VulkanInstance, WindowSurface,
};
use crate::config::Config;
use crate::error::GfxResult;

pub struct Renderer {
    context: GraphicsContext<VulkanDevice>,
    device: Arc<VulkanDevice>,
    surface: WindowSurface,
}

impl Renderer {
    pub fn new(
        window: &(impl HasRawDisplayHandle + HasRawWindowHandle),
        width: u32,
        height: u32,
        config: &Config,
    ) -> GfxResult<Self> {
        let display = window.raw_display_handle();

        let mut registry = CapabilityRegistry::with_defaults();
        let instance = VulkanInstance::new(
            &config.window.title,
            display,
            config.validation_enabled(),
            &mut registry,
        )?;
        let surface = WindowSurface::new(instance.clone(), display, window.raw_window_handle())?;

        let selection = select_adapter(&*instance, surface.handle(), config.graphics.adapter_policy)?;
        let device = VulkanDevice::new(instance, selection, &registry)?;

        let compiler = Glslc::new(&config.shaders.glslc);
        let shaders = ShaderSet::load(
            &config.shaders.vertex,
            &config.shaders.fragment,
            &config.shaders.entry_point,
            &compiler,
        )?;

        let settings = FrameSettings {
            clear_color: config.graphics.clear_color,
            timeouts: config.frame_timeouts(),
        };
        let context = GraphicsContext::new(
            device.clone(),
            surface.handle(),
            vk::Extent2D { width, height },
            shaders,
            settings,
        )?;

        log::info!("Renderer initialized successfully!");
        Ok(Self { context, device, surface })
    }

    pub fn render_frame(&mut self) -> GfxResult<FrameOutcome> {
        self.context.update()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    pub fn context(&self) -> &GraphicsContext<VulkanDevice> {
        &self.context
    }

    pub fn device(&self) -> &Arc<VulkanDevice> {
        &self.device
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface.handle()
    }
}
