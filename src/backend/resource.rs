// Scoped GPU objects
//
// Each wrapper owns exactly one handle and destroys it on drop, so early
// returns and `?` never leak or double-free.

use ash::vk;
use std::fmt;
use std::sync::Arc;

use super::gpu::Gpu;

/// A handle type the device knows how to destroy.
pub trait GpuResource: Copy + fmt::Debug {
    fn release<G: Gpu + ?Sized>(self, gpu: &G);
}

macro_rules! gpu_resource {
    ($($handle:ty => $destroy:ident),* $(,)?) => {
        $(
            impl GpuResource for $handle {
                fn release<G: Gpu + ?Sized>(self, gpu: &G) {
                    gpu.$destroy(self);
                }
            }
        )*
    };
}

gpu_resource! {
    vk::SwapchainKHR => destroy_swapchain,
    vk::ImageView => destroy_image_view,
    vk::Framebuffer => destroy_framebuffer,
    vk::RenderPass => destroy_render_pass,
    vk::ShaderModule => destroy_shader_module,
    vk::PipelineLayout => destroy_pipeline_layout,
    vk::Pipeline => destroy_pipeline,
    vk::Fence => destroy_fence,
    vk::Semaphore => destroy_semaphore,
    vk::CommandPool => destroy_command_pool,
}

/// Owns a handle for as long as it lives.
pub struct Scoped<G: Gpu, H: GpuResource> {
    gpu: Arc<G>,
    handle: H,
}

impl<G: Gpu, H: GpuResource> Scoped<G, H> {
    pub fn new(gpu: Arc<G>, handle: H) -> Self {
        Self { gpu, handle }
    }

    pub fn handle(&self) -> H {
        self.handle
    }
}

impl<G: Gpu, H: GpuResource> fmt::Debug for Scoped<G, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scoped").field(&self.handle).finish()
    }
}

impl<G: Gpu, H: GpuResource> Drop for Scoped<G, H> {
    fn drop(&mut self) {
        self.handle.release(&*self.gpu);
    }
}

pub type SwapchainHandle<G> = Scoped<G, vk::SwapchainKHR>;
pub type ImageView<G> = Scoped<G, vk::ImageView>;
pub type Framebuffer<G> = Scoped<G, vk::Framebuffer>;
pub type RenderPass<G> = Scoped<G, vk::RenderPass>;
pub type ShaderModule<G> = Scoped<G, vk::ShaderModule>;
pub type PipelineLayout<G> = Scoped<G, vk::PipelineLayout>;
pub type Pipeline<G> = Scoped<G, vk::Pipeline>;
pub type Fence<G> = Scoped<G, vk::Fence>;
pub type Semaphore<G> = Scoped<G, vk::Semaphore>;
pub type CommandPool<G> = Scoped<G, vk::CommandPool>;
