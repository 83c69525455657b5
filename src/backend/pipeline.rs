// Render pass, framebuffers and the graphics pipeline
//
// One color attachment in the swapchain format, one subpass. The pipeline
// draws without vertex buffers and takes viewport and scissor as dynamic
// state, so it survives a resize as long as the format stays the same.

use ash::vk;
use std::sync::Arc;

use super::gpu::Gpu;
use super::resource::{Framebuffer, Pipeline, PipelineLayout, RenderPass};
use super::shader::{create_shader_module, ShaderSet};
use crate::error::{GfxError, GfxResult};

/// Clear on load, keep for presentation.
pub fn create_render_pass<G: Gpu>(gpu: &Arc<G>, format: vk::Format) -> GfxResult<RenderPass<G>> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build();

    let color_attachment_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .build();

    let color_attachments = &[color_attachment_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments)
        .build();

    // Wait for the acquire semaphore's stage before writing color
    let dependency = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .build();

    let attachments = &[color_attachment];
    let subpasses = &[subpass];
    let dependencies = &[dependency];

    let render_pass_info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(dependencies);

    let render_pass = gpu
        .create_render_pass(&render_pass_info)
        .map_err(GfxError::RenderPassCreation)?;
    log::debug!("Created render pass for {:?}", format);
    Ok(RenderPass::new(gpu.clone(), render_pass))
}

/// One framebuffer per swapchain image view.
pub fn create_framebuffers<G: Gpu>(
    gpu: &Arc<G>,
    image_views: &[vk::ImageView],
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
) -> GfxResult<Vec<Framebuffer<G>>> {
    image_views
        .iter()
        .map(|&image_view| {
            let attachments = &[image_view];
            let framebuffer_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = gpu
                .create_framebuffer(&framebuffer_info)
                .map_err(GfxError::SwapchainCreation)?;
            Ok(Framebuffer::new(gpu.clone(), framebuffer))
        })
        .collect()
}

pub struct GraphicsPipeline<G: Gpu> {
    // Pipeline first: it must go before its layout
    pipeline: Pipeline<G>,
    layout: PipelineLayout<G>,
}

impl<G: Gpu> GraphicsPipeline<G> {
    pub fn new(gpu: &Arc<G>, render_pass: vk::RenderPass, shaders: &ShaderSet) -> GfxResult<Self> {
        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        let layout = gpu
            .create_pipeline_layout(&layout_info)
            .map_err(GfxError::PipelineCreation)?;
        let layout = PipelineLayout::new(gpu.clone(), layout);

        // Modules only need to live until the pipeline exists
        let vertex = create_shader_module(gpu, &shaders.vertex)?;
        let fragment = create_shader_module(gpu, &shaders.fragment)?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex.handle())
                .name(&shaders.entry_point)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment.handle())
                .name(&shaders.entry_point)
                .build(),
        ];

        // Vertices come from gl_VertexIndex
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // No depth attachment, so no depth testing
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder();

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();

        let color_blend_attachments = &[color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass)
            .subpass(0);

        let pipeline = gpu
            .create_graphics_pipeline(&pipeline_info)
            .map_err(GfxError::PipelineCreation)?;
        log::debug!("Created graphics pipeline");

        Ok(Self { pipeline: Pipeline::new(gpu.clone(), pipeline), layout })
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }
}
