// Render pass executor
//
// Records the fixed per-frame commands: clear, bind the pipeline, dynamic
// viewport and scissor over the whole image, one 3-vertex draw.

use ash::vk;

use super::gpu::Gpu;
use crate::error::{GfxError, GfxResult};

/// Vertices of the hard-coded triangle.
pub const VERTEX_COUNT: u32 = 3;

/// Everything the executor records against for one frame.
#[derive(Debug, Clone, Copy)]
pub struct PassTarget {
    pub command_buffer: vk::CommandBuffer,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub pipeline: vk::Pipeline,
    pub extent: vk::Extent2D,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassExecutor {
    clear_color: [f32; 4],
}

impl RenderPassExecutor {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self { clear_color }
    }

    pub fn record<G: Gpu + ?Sized>(&self, gpu: &G, target: &PassTarget) -> GfxResult<()> {
        let cmd = target.command_buffer;
        gpu.begin_command_buffer(cmd).map_err(GfxError::CommandRecording)?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: self.clear_color },
        }];
        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(target.render_pass)
            .framebuffer(target.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: target.extent,
            })
            .clear_values(&clear_values);

        gpu.cmd_begin_render_pass(cmd, &render_pass_info);
        gpu.cmd_bind_pipeline(cmd, target.pipeline);
        gpu.cmd_set_viewport(
            cmd,
            vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: target.extent.width as f32,
                height: target.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
        );
        gpu.cmd_set_scissor(
            cmd,
            vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: target.extent,
            },
        );
        gpu.cmd_draw(cmd, VERTEX_COUNT, 1);
        gpu.cmd_end_render_pass(cmd);

        gpu.end_command_buffer(cmd).map_err(GfxError::CommandRecording)
    }
}
