// Error taxonomy for the graphics core
//
// Initialization failures are fatal and bubble up to the entry point.
// Only swapchain staleness during acquire is handled locally (see context.rs).

use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

use crate::backend::sync::FrameState;

#[derive(Debug, Error)]
pub enum GfxError {
    #[error("failed to load the Vulkan library: {0}")]
    Loader(#[from] ash::LoadingError),

    #[error("instance creation failed: {0}")]
    InstanceCreation(vk::Result),

    #[error("surface creation failed: {0}")]
    SurfaceCreation(vk::Result),

    #[error("adapter enumeration failed: {0}")]
    AdapterEnumeration(vk::Result),

    #[error("no Vulkan adapter available")]
    NoSuitableDevice,

    #[error("no queue family supports both graphics and presentation")]
    NoSuitableQueue,

    #[error("logical device creation failed: {0}")]
    DeviceCreation(vk::Result),

    #[error("required extension {0} is not available")]
    MissingExtension(String),

    #[error("swapchain creation failed: {0}")]
    SwapchainCreation(vk::Result),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("render pass creation failed: {0}")]
    RenderPassCreation(vk::Result),

    #[error("pipeline creation failed: {0}")]
    PipelineCreation(vk::Result),

    #[error("cannot infer shader stage from {0:?}")]
    UnknownShaderStage(PathBuf),

    #[error("{stage:?} shader failed to compile: {log}")]
    ShaderCompilation { stage: vk::ShaderStageFlags, log: String },

    #[error("failed to read {path:?}: {source}")]
    FileLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frame resource creation failed: {0}")]
    FrameResource(vk::Result),

    #[error("waiting on frame fence failed: {0}")]
    FenceWait(vk::Result),

    #[error("command recording failed: {0}")]
    CommandRecording(vk::Result),

    #[error("queue operation failed: {0}")]
    Submission(vk::Result),

    #[error("image acquisition failed: {0}")]
    Acquire(vk::Result),

    #[error("presentation failed: {0}")]
    Present(vk::Result),

    #[error("frame step out of order: expected {expected:?}, found {found:?}")]
    OutOfOrder { expected: FrameState, found: FrameState },
}

pub type GfxResult<T> = Result<T, GfxError>;
