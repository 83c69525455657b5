// gfx-core - device lifecycle and per-frame synchronization for a Vulkan renderer
//
// ┌──────────────────────────────────────────────────────────────┐
// │  Renderer (instance + surface + device, real backend only)    │
// │    └── GraphicsContext<G: Gpu>                                │
// │          ├── Swapchain (views, dimensions)                    │
// │          ├── RenderPass + Pipeline + Framebuffers             │
// │          └── FrameSynchronizer (per-image slots, sem pool)    │
// └──────────────────────────────────────────────────────────────┘

pub mod backend;
pub mod config;
pub mod error;
pub mod fs;
pub mod renderer;

pub use backend::context::{FrameOutcome, GraphicsContext};
pub use error::{GfxError, GfxResult};
pub use renderer::Renderer;
