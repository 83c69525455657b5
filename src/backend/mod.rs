// Backend module - Vulkan abstraction layer
//
// Everything above `device` is written against the `Gpu` trait, so the
// swapchain, frame pacing and recording logic run the same on the real
// device and on the test mock.

pub mod capability;
pub mod context;
pub mod device;
pub mod draw;
pub mod gpu;
pub mod pipeline;
pub mod resource;
pub mod selector;
pub mod shader;
pub mod swapchain;
pub mod sync;

#[cfg(test)]
pub(crate) mod mock;

pub use capability::CapabilityRegistry;
pub use context::{FrameOutcome, FrameSettings, GraphicsContext};
pub use device::{VulkanDevice, VulkanInstance, WindowSurface};
pub use gpu::Gpu;
pub use selector::{select_adapter, AdapterPolicy, AdapterSelection};
pub use shader::{Glslc, ShaderSet};
pub use swapchain::Swapchain;
pub use sync::{FrameState, FrameTimeouts};
